pub mod center;
pub mod coordinator;
pub mod counter;
pub mod generation;
pub mod list_store;
pub mod poller;

#[cfg(test)]
pub(crate) mod testing;

pub use center::NotificationCenter;
pub use coordinator::{OpenOutcome, ReadStateCoordinator};
pub use counter::{CounterSnapshot, UnreadCounter};
pub use list_store::{ListSnapshot, NotificationListStore};
pub use poller::{PollOutcome, PollerHandle};
