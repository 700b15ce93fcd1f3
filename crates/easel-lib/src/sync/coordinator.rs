//! Read-state coordinator
//!
//! Handles the user actions that change read state: opening the bell panel,
//! the explicit "mark all as read" button and marking a single notification.
//! Mark-all zeroes the counter as soon as the server confirms, and the
//! counter's generation gate makes sure no poll that started before the
//! confirmation can bring the old number back.

use crate::api::NotificationSource;
use crate::error::GatewayResult;
use crate::models::NotificationId;
use crate::sync::counter::UnreadCounter;
use crate::sync::list_store::NotificationListStore;
use std::sync::{Arc, Mutex, PoisonError};

/// What happened when the bell was clicked.
#[derive(Debug)]
pub struct OpenOutcome {
    pub is_open: bool,
    /// Present when opening triggered a mark-all request
    pub mark_all: Option<GatewayResult<()>>,
}

pub struct ReadStateCoordinator {
    source: Arc<dyn NotificationSource>,
    counter: UnreadCounter,
    list: Option<NotificationListStore>,
    panel_open: Mutex<bool>,
}

impl ReadStateCoordinator {
    pub fn new(source: Arc<dyn NotificationSource>, counter: UnreadCounter) -> Self {
        Self {
            source,
            counter,
            list: None,
            panel_open: Mutex::new(false),
        }
    }

    /// Also refresh this list after single-notification updates.
    pub fn with_list(mut self, list: NotificationListStore) -> Self {
        self.list = Some(list);
        self
    }

    pub fn is_open(&self) -> bool {
        *self.panel_open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Toggle the panel. Opening it with unread notifications marks them all
    /// read; a failure there is logged and returned but the panel stays open.
    pub async fn open(&self) -> OpenOutcome {
        let opening = {
            let mut open = self.panel_open.lock().unwrap_or_else(PoisonError::into_inner);
            *open = !*open;
            *open
        };

        if !opening || self.counter.count() == 0 {
            return OpenOutcome {
                is_open: opening,
                mark_all: None,
            };
        }

        OpenOutcome {
            is_open: true,
            mark_all: Some(self.mark_all_read().await),
        }
    }

    pub fn close(&self) {
        *self.panel_open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Mark every notification read and show zero unread once confirmed.
    pub async fn mark_all_read(&self) -> GatewayResult<()> {
        self.counter.begin_mark_all();

        match self.source.mark_all_read().await {
            Ok(_) => {
                self.counter.finish_mark_all(true);
                log::info!("[ReadStateCoordinator] All notifications marked as read");
                Ok(())
            }
            Err(e) => {
                self.counter.finish_mark_all(false);
                log::error!("[ReadStateCoordinator] Failed to mark notifications as read: {}", e);
                Err(e)
            }
        }
    }

    /// Mark one notification read, then re-read the server's count (and list)
    /// rather than adjusting the numbers locally.
    pub async fn mark_read(&self, id: &NotificationId) -> GatewayResult<()> {
        if let Err(e) = self.source.mark_read(id).await {
            log::error!("[ReadStateCoordinator] Failed to mark notification {} as read: {}", id, e);
            return Err(e);
        }

        self.counter.poll_once().await;
        if let Some(list) = &self.list {
            list.refresh().await;
        }
        Ok(())
    }
}
