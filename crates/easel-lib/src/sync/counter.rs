//! Unread notification counter
//!
//! Holds the unread count shown on the bell. The count only ever changes to
//! a value the server actually returned (or to zero after a confirmed
//! mark-all); a failed poll leaves it alone. When a poll reports more unread
//! notifications than are currently shown, a short-lived signal is raised so
//! the bell can animate.

use crate::api::NotificationSource;
use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::sync::generation::{GenerationGate, Ticket};
use crate::sync::poller::{spawn_poller, BoxFuture, PollOutcome, PollTask, PollerHandle};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub count: u64,
    pub is_signaling: bool,
    /// Incremented every time a new signal is raised
    pub signal_seq: u64,
}

struct CounterState {
    snapshot: CounterSnapshot,
    gate: GenerationGate,
    poller: Option<PollerHandle>,
}

struct CounterInner {
    source: Arc<dyn NotificationSource>,
    state: Mutex<CounterState>,
    updates: watch::Sender<CounterSnapshot>,
    interval: Duration,
    signal_duration: Duration,
}

impl CounterInner {
    fn state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: CounterSnapshot) {
        self.updates.send_replace(snapshot);
    }
}

#[derive(Clone)]
pub struct UnreadCounter {
    inner: Arc<CounterInner>,
}

impl UnreadCounter {
    pub fn new(source: Arc<dyn NotificationSource>, config: &ClientConfig) -> Self {
        Self::with_timing(source, config.unread_poll_interval(), config.signal_duration())
    }

    pub fn with_timing(
        source: Arc<dyn NotificationSource>,
        interval: Duration,
        signal_duration: Duration,
    ) -> Self {
        let (updates, _) = watch::channel(CounterSnapshot::default());
        Self {
            inner: Arc::new(CounterInner {
                source,
                state: Mutex::new(CounterState {
                    snapshot: CounterSnapshot::default(),
                    gate: GenerationGate::new(),
                    poller: None,
                }),
                updates,
                interval,
                signal_duration,
            }),
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.inner.state().snapshot
    }

    pub fn count(&self) -> u64 {
        self.snapshot().count
    }

    pub fn is_signaling(&self) -> bool {
        self.snapshot().is_signaling
    }

    pub fn subscribe(&self) -> watch::Receiver<CounterSnapshot> {
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

    /// Start polling: once now, then every configured interval. Calling this
    /// while already polling does nothing.
    pub fn activate(&self) {
        let mut state = self.inner.state();
        if state.poller.as_ref().is_some_and(|p| !p.is_stopped()) {
            return;
        }
        state.gate.reopen();
        let task = Arc::new(CounterPoll {
            inner: Arc::downgrade(&self.inner),
        });
        state.poller = Some(spawn_poller(task, self.inner.interval));
        log::debug!("[UnreadCounter] Activated");
    }

    /// Stop polling. Responses still in flight are ignored when they land.
    pub fn deactivate(&self) {
        let (poller, snapshot) = {
            let mut state = self.inner.state();
            state.gate.close();
            state.snapshot.is_signaling = false;
            (state.poller.take(), state.snapshot)
        };
        drop(poller);
        self.inner.publish(snapshot);
        log::debug!("[UnreadCounter] Deactivated");
    }

    /// Run one poll now.
    pub async fn poll_once(&self) -> PollOutcome {
        poll(self.inner.clone()).await
    }

    /// A mark-all request is about to be sent; anything already in flight
    /// predates it.
    pub(crate) fn begin_mark_all(&self) {
        self.inner.state().gate.invalidate();
    }

    /// A mark-all request finished. On success the count drops to zero in the
    /// same critical section that invalidates polls issued while the request
    /// was outstanding.
    pub(crate) fn finish_mark_all(&self, succeeded: bool) {
        let snapshot = {
            let mut state = self.inner.state();
            state.gate.invalidate();
            if !succeeded {
                return;
            }
            state.snapshot.count = 0;
            state.snapshot.is_signaling = false;
            state.snapshot
        };
        self.inner.publish(snapshot);
    }
}

struct CounterPoll {
    inner: Weak<CounterInner>,
}

impl PollTask for CounterPoll {
    fn name(&self) -> String {
        "unread-counter".to_string()
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

async fn poll(inner: Arc<CounterInner>) -> PollOutcome {
    let ticket = inner.state().gate.issue();

    match inner.source.unread_count().await {
        Ok(value) => apply(&inner, ticket, value),
        Err(e) if e.is_session_ending() => {
            log::warn!("[UnreadCounter] Session ended, stopping unread polling");
            PollOutcome::SessionEnded
        }
        Err(GatewayError::MissingCredential) => PollOutcome::Failed,
        Err(e) => {
            log::warn!("[UnreadCounter] Keeping previous count, poll failed: {}", e);
            PollOutcome::Failed
        }
    }
}

fn apply(inner: &Arc<CounterInner>, ticket: Ticket, value: u64) -> PollOutcome {
    let (snapshot, raised) = {
        let mut state = inner.state();
        if !state.gate.admit(ticket) {
            log::debug!("[UnreadCounter] Dropping stale unread count {}", value);
            return PollOutcome::Discarded;
        }

        let previous = state.snapshot.count;
        state.snapshot.count = value;
        let raised = value > previous;
        if raised {
            state.snapshot.is_signaling = true;
            state.snapshot.signal_seq += 1;
        }
        (state.snapshot, raised)
    };

    inner.publish(snapshot);
    if raised {
        log::debug!("[UnreadCounter] New notifications ({})", value);
        schedule_signal_clear(inner, snapshot.signal_seq);
    }
    PollOutcome::Applied
}

fn schedule_signal_clear(inner: &Arc<CounterInner>, seq: u64) {
    let weak = Arc::downgrade(inner);
    let delay = inner.signal_duration;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let snapshot = {
            let mut state = inner.state();
            // A later signal owns its own clear
            if state.gate.is_closed() || state.snapshot.signal_seq != seq {
                return;
            }
            state.snapshot.is_signaling = false;
            state.snapshot
        };
        inner.publish(snapshot);
    });
}
