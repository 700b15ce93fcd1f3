use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single poll, as far as the polling loop cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Response applied to local state
    Applied,
    /// Response arrived but was stale or the owner was torn down
    Discarded,
    /// Request failed; previous state kept
    Failed,
    /// Server rejected the credential; stop polling for this session
    SessionEnded,
    /// Owner no longer exists
    Detached,
}

impl PollOutcome {
    fn halts_polling(self) -> bool {
        matches!(self, PollOutcome::SessionEnded | PollOutcome::Detached)
    }
}

/// Something that can be polled on a timer.
pub trait PollTask: Send + Sync + 'static {
    fn name(&self) -> String;
    /// Issue one poll. The returned future must not borrow `self`, so a
    /// slow request never holds up the timer.
    fn poll(&self) -> BoxFuture<'static, PollOutcome>;
}

/// Cancellation token shared between a poller loop and its in-flight polls.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Owns a running poll loop. Stopping (or dropping) the handle cancels the
/// interval before returning.
pub struct PollerHandle {
    name: String,
    cancel_tx: Arc<watch::Sender<bool>>,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.cancel_tx.subscribe(),
        }
    }

    /// True once the loop has been cancelled, either by `stop` or because a
    /// poll ended the session.
    pub fn is_stopped(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn stop(&mut self) {
        self.cancel_tx.send_replace(true);
        if let Some(join) = self.join.take() {
            join.abort();
            log::debug!("[poller] Stopped {}", self.name);
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll `task` immediately and then every `every`.
///
/// Each tick runs its poll as a separate task so a hung request only delays
/// its own effect. A poll reporting `SessionEnded` or `Detached` cancels the
/// loop.
pub fn spawn_poller(task: Arc<dyn PollTask>, every: Duration) -> PollerHandle {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);
    let halt = cancel_tx.clone();
    let name = task.name();
    let loop_name = name.clone();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::debug!("[poller] Started {} (every {:?})", loop_name, every);

        loop {
            if *cancel_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let poll = task.poll();
                    let halt = halt.clone();
                    let name = loop_name.clone();
                    tokio::spawn(async move {
                        let outcome = poll.await;
                        if outcome.halts_polling() {
                            log::warn!("[poller] Halting {}: {:?}", name, outcome);
                            halt.send_replace(true);
                        }
                    });
                }
            }
        }

        log::debug!("[poller] Loop for {} exited", loop_name);
    });

    PollerHandle {
        name,
        cancel_tx,
        join: Some(join),
    }
}
