//! Notification client for the Easel art community.
//!
//! Polls the server for the unread count and the notification list, and
//! keeps the bell's read state consistent when the user marks things read.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod sync;

pub use api::{NotificationGateway, NotificationSource, SessionState};
pub use config::ClientConfig;
pub use error::{GatewayError, GatewayResult};
pub use sync::NotificationCenter;
