//! Notification list store
//!
//! Keeps the dropdown's notification list. Each successful poll replaces the
//! list wholesale; a failed poll keeps whatever was there. The list is polled
//! on its own timer and can briefly disagree with the unread counter.

use crate::api::NotificationSource;
use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::models::Notification;
use crate::sync::generation::{GenerationGate, Ticket};
use crate::sync::poller::{spawn_poller, BoxFuture, PollOutcome, PollTask, PollerHandle};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListSnapshot {
    pub items: Vec<Notification>,
    pub is_loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ListSnapshot {
    /// Unread items in this page. Not the same thing as the unread counter,
    /// which covers every notification and is polled separately.
    pub fn unread_in_page(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }
}

struct ListState {
    snapshot: ListSnapshot,
    gate: GenerationGate,
    in_flight: BTreeSet<Ticket>,
    poller: Option<PollerHandle>,
}

struct ListInner {
    source: Arc<dyn NotificationSource>,
    state: Mutex<ListState>,
    updates: watch::Sender<ListSnapshot>,
    interval: Duration,
    page_size: u32,
}

impl ListInner {
    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct NotificationListStore {
    inner: Arc<ListInner>,
}

impl NotificationListStore {
    pub fn new(source: Arc<dyn NotificationSource>, config: &ClientConfig) -> Self {
        Self::with_timing(source, config.list_poll_interval(), config.page_size)
    }

    pub fn with_timing(source: Arc<dyn NotificationSource>, interval: Duration, page_size: u32) -> Self {
        let (updates, _) = watch::channel(ListSnapshot::default());
        Self {
            inner: Arc::new(ListInner {
                source,
                state: Mutex::new(ListState {
                    snapshot: ListSnapshot::default(),
                    gate: GenerationGate::new(),
                    in_flight: BTreeSet::new(),
                    poller: None,
                }),
                updates,
                interval,
                page_size,
            }),
        }
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.inner.state().snapshot.clone()
    }

    pub fn items(&self) -> Vec<Notification> {
        self.snapshot().items
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state().snapshot.is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .state()
            .poller
            .as_ref()
            .map(|p| !p.is_stopped())
            .unwrap_or(false)
    }

    pub fn activate(&self) {
        let mut state = self.inner.state();
        if state.poller.as_ref().is_some_and(|p| !p.is_stopped()) {
            return;
        }
        state.gate.reopen();
        let task = Arc::new(ListPoll {
            inner: Arc::downgrade(&self.inner),
        });
        state.poller = Some(spawn_poller(task, self.inner.interval));
        log::debug!("[NotificationList] Activated");
    }

    pub fn deactivate(&self) {
        let (poller, snapshot) = {
            let mut state = self.inner.state();
            state.gate.close();
            state.in_flight.clear();
            state.snapshot.is_loading = false;
            (state.poller.take(), state.snapshot.clone())
        };
        drop(poller);
        self.inner.updates.send_replace(snapshot);
        log::debug!("[NotificationList] Deactivated");
    }

    /// Fetch the list now. Failures never escape; they are reported through
    /// the outcome and the previous items stay in place.
    pub async fn refresh(&self) -> PollOutcome {
        poll(self.inner.clone()).await
    }
}

struct ListPoll {
    inner: Weak<ListInner>,
}

impl PollTask for ListPoll {
    fn name(&self) -> String {
        "notification-list".to_string()
    }

    fn poll(&self) -> BoxFuture<'static, PollOutcome> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.upgrade() {
                Some(inner) => poll(inner).await,
                None => PollOutcome::Detached,
            }
        })
    }
}

async fn poll(inner: Arc<ListInner>) -> PollOutcome {
    let ticket = {
        let mut state = inner.state();
        let ticket = state.gate.issue();
        state.in_flight.insert(ticket);
        state.snapshot.is_loading = true;
        inner.updates.send_replace(state.snapshot.clone());
        ticket
    };

    let result = inner.source.fetch_page(inner.page_size, 0).await;

    let mut state = inner.state();
    if !state.in_flight.remove(&ticket) {
        // torn down while the request was outstanding
        return PollOutcome::Discarded;
    }
    state.snapshot.is_loading = !state.in_flight.is_empty();

    let outcome = match result {
        Ok(items) => {
            if state.gate.admit(ticket) {
                log::debug!("[NotificationList] Loaded {} notifications", items.len());
                state.snapshot.items = items;
                state.snapshot.last_updated = Some(Utc::now());
                PollOutcome::Applied
            } else {
                log::debug!("[NotificationList] Dropping out-of-order response");
                PollOutcome::Discarded
            }
        }
        Err(e) if e.is_session_ending() => {
            log::warn!("[NotificationList] Session ended, stopping list polling");
            PollOutcome::SessionEnded
        }
        Err(GatewayError::MissingCredential) => PollOutcome::Failed,
        Err(e) => {
            log::error!("[NotificationList] Failed to fetch notifications: {}", e);
            PollOutcome::Failed
        }
    };

    inner.updates.send_replace(state.snapshot.clone());
    outcome
}
