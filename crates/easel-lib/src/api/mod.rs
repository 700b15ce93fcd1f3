use crate::error::GatewayResult;
use crate::models::{MarkReadAck, Notification, NotificationId};
use async_trait::async_trait;

pub mod notifications;

pub use notifications::{NotificationGateway, SessionState};

/// Server operations the pollers and the read-state coordinator depend on.
///
/// [`NotificationGateway`] is the production implementation; tests drive the
/// sync layer through scripted sources instead.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch_page(&self, limit: u32, offset: u32) -> GatewayResult<Vec<Notification>>;
    async fn unread_count(&self) -> GatewayResult<u64>;
    async fn mark_read(&self, id: &NotificationId) -> GatewayResult<MarkReadAck>;
    async fn mark_all_read(&self) -> GatewayResult<MarkReadAck>;
}
