//! Notification API client
//!
//! Wraps the four notification endpoints of the Easel server. Every endpoint
//! requires a bearer credential; without one the request is not sent at all.
//! A 401 from any endpoint ends the session: the stored credential is wiped
//! and `SessionState::Expired` is published to subscribers.

use crate::api::NotificationSource;
use crate::auth::{Credential, CredentialStore};
use crate::config::{ClientConfig, DEFAULT_PAGE_SIZE};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{
    MarkReadAck, Notification, NotificationId, NotificationListResponse, UnreadCountResponse,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;

/// Authentication state of the current session as seen by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// The server rejected the credential; it has been cleared
    Expired,
}

pub struct NotificationGateway {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    session: watch::Sender<SessionState>,
}

impl NotificationGateway {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let parsed = url::Url::parse(&config.api_url)
            .with_context(|| format!("Invalid API url: {}", config.api_url))?;

        let mut builder =
            Client::builder().user_agent(concat!("Easel/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let (session, _) = watch::channel(SessionState::Active);

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            credentials,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_state(&self) -> SessionState {
        *self.session.borrow()
    }

    /// Receive session changes; the presentation layer uses this to send the
    /// user back to the login screen.
    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Fetch a page of notifications, newest first.
    ///
    /// Returns an empty list on any failure. An empty result therefore means
    /// "nothing available", not "no notifications"; use
    /// [`try_fetch_notifications`](Self::try_fetch_notifications) to tell the
    /// two apart.
    pub async fn fetch_notifications(&self, limit: u32, offset: u32) -> Vec<Notification> {
        match self.try_fetch_notifications(limit, offset).await {
            Ok(items) => items,
            Err(e) => {
                log::error!("[gateway] Error fetching notifications: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn fetch_notifications_default(&self) -> Vec<Notification> {
        self.fetch_notifications(DEFAULT_PAGE_SIZE, 0).await
    }

    pub async fn try_fetch_notifications(
        &self,
        limit: u32,
        offset: u32,
    ) -> GatewayResult<Vec<Notification>> {
        let request = self
            .client
            .get(format!("{}/notifications/with-details", self.base_url))
            .query(&[("limit", limit), ("offset", offset)]);

        let response = self.send(request, "fetch notifications").await?;
        let body: NotificationListResponse = decode(response).await?;
        log::debug!("[gateway] Fetched {} notifications", body.notifications.len());
        Ok(body.notifications)
    }

    /// Fetch the unread count. Unlike the list, failures are returned to the
    /// caller, which decides whether to keep showing the previous value.
    pub async fn fetch_unread_count(&self) -> GatewayResult<u64> {
        let request = self
            .client
            .get(format!("{}/notifications/unread-count", self.base_url));

        let response = self.send(request, "fetch unread count").await?;
        let body: UnreadCountResponse = decode(response).await?;
        log::debug!("[gateway] Unread count: {}", body.unread_count);
        Ok(body.unread_count)
    }

    /// Mark one notification read. Marking an already read notification
    /// succeeds.
    pub async fn mark_as_read(&self, id: &NotificationId) -> bool {
        match self.try_mark_as_read(id).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("[gateway] Error marking notification {} as read: {}", id, e);
                false
            }
        }
    }

    pub async fn try_mark_as_read(&self, id: &NotificationId) -> GatewayResult<MarkReadAck> {
        let request = self.client.post(format!(
            "{}/notifications/{}/mark-read",
            self.base_url,
            urlencoding::encode(id.as_str())
        ));

        let response = self.send(request, "mark notification read").await?;
        accept_ack(response).await
    }

    pub async fn mark_all_as_read(&self) -> bool {
        match self.try_mark_all_as_read().await {
            Ok(_) => true,
            Err(e) => {
                log::error!("[gateway] Error marking all notifications as read: {}", e);
                false
            }
        }
    }

    pub async fn try_mark_all_as_read(&self) -> GatewayResult<MarkReadAck> {
        let request = self
            .client
            .post(format!("{}/notifications/mark-all-read", self.base_url));

        let response = self.send(request, "mark all notifications read").await?;
        let ack = accept_ack(response).await?;
        log::info!(
            "[gateway] {}",
            ack.message.as_deref().unwrap_or("Marked all notifications as read")
        );
        Ok(ack)
    }

    fn credential(&self) -> GatewayResult<Credential> {
        match self.credentials.get() {
            Some(credential) => Ok(credential),
            None => {
                log::debug!("[gateway] No credential found, skipping request");
                Err(GatewayError::MissingCredential)
            }
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> GatewayResult<Response> {
        let credential = self.credential()?;

        let response = request.bearer_auth(credential.secret()).send().await?;
        let status = response.status();

        if status.is_success() {
            // A response to a request sent before an expiry must not revive it
            if self.is_current(&credential) {
                self.session.send_if_modified(|state| {
                    let changed = *state != SessionState::Active;
                    *state = SessionState::Active;
                    changed
                });
            }
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::error!("[gateway] Failed to {}: HTTP {} - {}", action, status, body);

        // A 401 for a token that a newer login already replaced is an
        // ordinary failure
        if status == StatusCode::UNAUTHORIZED && self.end_session(&credential) {
            return Err(GatewayError::Unauthorized);
        }

        Err(GatewayError::Status { status, body })
    }

    fn is_current(&self, credential: &Credential) -> bool {
        self.credentials.get().as_ref() == Some(credential)
    }

    /// Wipe the rejected credential and tell subscribers the session is over.
    ///
    /// Returns false when the store already holds a different credential, in
    /// which case nothing is cleared and the session stays as it is.
    fn end_session(&self, rejected: &Credential) -> bool {
        match self.credentials.clear_if_current(rejected) {
            Ok(true) => {}
            Ok(false) => {
                if self.credentials.get().is_some() {
                    log::debug!("[gateway] Ignoring 401 for a credential that has since been replaced");
                    return false;
                }
            }
            Err(e) => log::error!("[gateway] Failed to clear stored credential: {}", e),
        }

        log::warn!("[gateway] Authentication failed - user needs to log in again");
        self.session.send_if_modified(|state| {
            let changed = *state != SessionState::Expired;
            *state = SessionState::Expired;
            changed
        });
        true
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn accept_ack(response: Response) -> GatewayResult<MarkReadAck> {
    let bytes = response.bytes().await?;
    let ack = parse_ack(&bytes)?;
    if !ack.success {
        return Err(GatewayError::Rejected {
            message: ack.message.unwrap_or_default(),
        });
    }
    Ok(ack)
}

fn parse_ack(bytes: &[u8]) -> GatewayResult<MarkReadAck> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MarkReadAck::default());
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
impl NotificationSource for NotificationGateway {
    async fn fetch_page(&self, limit: u32, offset: u32) -> GatewayResult<Vec<Notification>> {
        self.try_fetch_notifications(limit, offset).await
    }

    async fn unread_count(&self) -> GatewayResult<u64> {
        self.fetch_unread_count().await
    }

    async fn mark_read(&self, id: &NotificationId) -> GatewayResult<MarkReadAck> {
        self.try_mark_as_read(id).await
    }

    async fn mark_all_read(&self) -> GatewayResult<MarkReadAck> {
        self.try_mark_all_as_read().await
    }
}
