//! Scripted notification source for driving the sync layer in tests.

use crate::api::NotificationSource;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{MarkReadAck, Notification, NotificationId, NotificationKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

enum Scripted<T> {
    Ready(GatewayResult<T>),
    Pending(oneshot::Receiver<GatewayResult<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> GatewayResult<T> {
        match self {
            Scripted::Ready(result) => result,
            Scripted::Pending(rx) => rx.await.unwrap_or_else(|_| Err(ScriptedSource::server_error())),
        }
    }
}

struct Queue<T> {
    items: Mutex<VecDeque<Scripted<T>>>,
    calls: AtomicU64,
}

impl<T> Queue<T> {
    fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
        }
    }

    fn push(&self, item: Scripted<T>) {
        self.items.lock().unwrap().push_back(item);
    }

    fn next(&self) -> Option<Scripted<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.items.lock().unwrap().pop_front()
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSource {
    counts: Queue<u64>,
    pages: Queue<Vec<Notification>>,
    mark_all: Queue<MarkReadAck>,
    mark_one: Queue<MarkReadAck>,
    marked: Mutex<Vec<NotificationId>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            counts: Queue::new(),
            pages: Queue::new(),
            mark_all: Queue::new(),
            mark_one: Queue::new(),
            marked: Mutex::new(Vec::new()),
        }
    }

    pub fn server_error() -> GatewayError {
        GatewayError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Internal Server Error".to_string(),
        }
    }

    pub fn push_counts(&self, results: impl IntoIterator<Item = GatewayResult<u64>>) {
        for result in results {
            self.counts.push(Scripted::Ready(result));
        }
    }

    pub fn push_pending_count(&self) -> oneshot::Sender<GatewayResult<u64>> {
        let (tx, rx) = oneshot::channel();
        self.counts.push(Scripted::Pending(rx));
        tx
    }

    pub fn push_pages(&self, results: impl IntoIterator<Item = GatewayResult<Vec<Notification>>>) {
        for result in results {
            self.pages.push(Scripted::Ready(result));
        }
    }

    pub fn push_pending_page(&self) -> oneshot::Sender<GatewayResult<Vec<Notification>>> {
        let (tx, rx) = oneshot::channel();
        self.pages.push(Scripted::Pending(rx));
        tx
    }

    pub fn push_mark_all(&self, result: GatewayResult<MarkReadAck>) {
        self.mark_all.push(Scripted::Ready(result));
    }

    pub fn push_pending_mark_all(&self) -> oneshot::Sender<GatewayResult<MarkReadAck>> {
        let (tx, rx) = oneshot::channel();
        self.mark_all.push(Scripted::Pending(rx));
        tx
    }

    pub fn push_mark_one(&self, result: GatewayResult<MarkReadAck>) {
        self.mark_one.push(Scripted::Ready(result));
    }

    pub fn count_calls(&self) -> u64 {
        self.counts.calls()
    }

    pub fn page_calls(&self) -> u64 {
        self.pages.calls()
    }

    pub fn mark_all_calls(&self) -> u64 {
        self.mark_all.calls()
    }

    pub fn marked_ids(&self) -> Vec<NotificationId> {
        self.marked.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSource for ScriptedSource {
    async fn fetch_page(&self, _limit: u32, _offset: u32) -> GatewayResult<Vec<Notification>> {
        match self.pages.next() {
            Some(scripted) => scripted.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn unread_count(&self) -> GatewayResult<u64> {
        match self.counts.next() {
            Some(scripted) => scripted.resolve().await,
            None => Err(Self::server_error()),
        }
    }

    async fn mark_read(&self, id: &NotificationId) -> GatewayResult<MarkReadAck> {
        self.marked.lock().unwrap().push(id.clone());
        match self.mark_one.next() {
            Some(scripted) => scripted.resolve().await,
            None => Ok(MarkReadAck::default()),
        }
    }

    async fn mark_all_read(&self) -> GatewayResult<MarkReadAck> {
        match self.mark_all.next() {
            Some(scripted) => scripted.resolve().await,
            None => Ok(MarkReadAck::default()),
        }
    }
}

pub fn notification(id: i64, kind: &str, is_read: bool) -> Notification {
    Notification {
        id: NotificationId::from(id),
        kind: NotificationKind::from(kind),
        message: format!("notification {}", id),
        timestamp: chrono::Utc::now(),
        is_read,
        username: None,
    }
}
