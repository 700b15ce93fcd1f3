//! Wires the gateway, counter, list store and coordinator together for an
//! embedding application.

use crate::api::{NotificationGateway, NotificationSource, SessionState};
use crate::config::ClientConfig;
use crate::sync::coordinator::ReadStateCoordinator;
use crate::sync::counter::UnreadCounter;
use crate::sync::list_store::NotificationListStore;
use crate::sync::poller::PollOutcome;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

pub struct NotificationCenter {
    gateway: Arc<NotificationGateway>,
    counter: UnreadCounter,
    list: NotificationListStore,
    coordinator: ReadStateCoordinator,
    session_watch: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationCenter {
    pub fn new(gateway: Arc<NotificationGateway>, config: &ClientConfig) -> Self {
        let source: Arc<dyn NotificationSource> = gateway.clone();
        let counter = UnreadCounter::new(source.clone(), config);
        let list = NotificationListStore::new(source.clone(), config);
        let coordinator =
            ReadStateCoordinator::new(source, counter.clone()).with_list(list.clone());

        Self {
            gateway,
            counter,
            list,
            coordinator,
            session_watch: Mutex::new(None),
        }
    }

    pub fn gateway(&self) -> &Arc<NotificationGateway> {
        &self.gateway
    }

    pub fn counter(&self) -> &UnreadCounter {
        &self.counter
    }

    pub fn list(&self) -> &NotificationListStore {
        &self.list
    }

    pub fn coordinator(&self) -> &ReadStateCoordinator {
        &self.coordinator
    }

    /// Start both pollers. They are stopped together as soon as the gateway
    /// reports an expired session.
    pub fn activate(&self) {
        self.counter.activate();
        self.list.activate();

        let mut watch = self.session_watch.lock().unwrap_or_else(PoisonError::into_inner);
        if watch.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let mut session = self.gateway.subscribe_session();
        let counter = self.counter.clone();
        let list = self.list.clone();
        *watch = Some(tokio::spawn(async move {
            while session.changed().await.is_ok() {
                if *session.borrow_and_update() == SessionState::Expired {
                    log::info!("[NotificationCenter] Session expired, stopping pollers");
                    counter.deactivate();
                    list.deactivate();
                    break;
                }
            }
        }));
    }

    /// Poll the counter and the list once, concurrently.
    pub async fn refresh_now(&self) -> (PollOutcome, PollOutcome) {
        futures::join!(self.counter.poll_once(), self.list.refresh())
    }

    pub fn deactivate(&self) {
        if let Some(handle) = self
            .session_watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.counter.deactivate();
        self.list.deactivate();
        self.coordinator.close();
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.deactivate();
    }
}
