//! Debounce timer state of one dispatcher.
//!
//! Holds at most one pending action. Every trigger takes the next sequence
//! number; a timer that wakes up after being replaced finds a different
//! pending sequence and must not dispatch.

use geolive_core::{DispatcherState, SessionSeq};
use tokio::task::JoinHandle;

struct Pending {
    seq: SessionSeq,
    handle: JoinHandle<()>,
}

/// Result of arming the timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Armed {
    pub seq: SessionSeq,
    pub superseded: Option<SessionSeq>,
}

#[derive(Default)]
pub(crate) struct Schedule {
    last_seq: SessionSeq,
    pending: Option<Pending>,
    in_flight: usize,
}

impl Schedule {
    /// Cancel any pending action and arm a new one built by `spawn`.
    pub fn arm(&mut self, spawn: impl FnOnce(SessionSeq) -> JoinHandle<()>) -> Armed {
        let superseded = self.cancel();
        self.last_seq = self.last_seq.next();
        let seq = self.last_seq;
        self.pending = Some(Pending {
            seq,
            handle: spawn(seq),
        });
        Armed { seq, superseded }
    }

    /// Take a sequence number for a session that starts right away.
    pub fn dispatch_now(&mut self) -> SessionSeq {
        self.last_seq = self.last_seq.next();
        self.in_flight += 1;
        self.last_seq
    }

    /// Abort the pending action, if any.
    pub fn cancel(&mut self) -> Option<SessionSeq> {
        self.pending.take().map(|pending| {
            pending.handle.abort();
            pending.seq
        })
    }

    /// Called by a timer whose quiet window elapsed. Returns whether it is
    /// still the pending action; if so it becomes an in-flight session.
    pub fn fire(&mut self, seq: SessionSeq) -> bool {
        match &self.pending {
            Some(pending) if pending.seq == seq => {
                self.pending = None;
                self.in_flight += 1;
                true
            }
            _ => false,
        }
    }

    /// A session ended.
    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn state(&self) -> DispatcherState {
        if self.pending.is_some() {
            DispatcherState::Armed
        } else if self.in_flight > 0 {
            DispatcherState::Dispatching
        } else {
            DispatcherState::Idle
        }
    }
}
