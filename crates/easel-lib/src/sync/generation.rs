/// Sequence tag handed out when a request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Decides whether an asynchronous response may still be applied.
///
/// Every request takes a ticket when it is issued. A response is admitted
/// only if its ticket is at or above the floor and newer than the last
/// admitted ticket. `invalidate` moves the floor past everything issued so
/// far; `close` rejects everything from then on.
#[derive(Debug, Default)]
pub struct GenerationGate {
    issued: u64,
    floor: u64,
    applied: u64,
    closed: bool,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Make every ticket issued so far stale.
    pub fn invalidate(&mut self) {
        self.floor = self.issued + 1;
    }

    pub fn admit(&mut self, ticket: Ticket) -> bool {
        if self.closed || ticket.0 < self.floor || ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Reopen after `close`, discarding anything issued before.
    pub fn reopen(&mut self) {
        self.invalidate();
        self.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
