//! Observable dispatcher events and counters.

use serde::Serialize;

use crate::errors::DispatchError;
use crate::ids::SessionSeq;
use crate::state::SessionState;

/// Something a dispatcher did, published on its broadcast channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A trigger captured `value` and armed the timer.
    Armed {
        /// Sequence the session will carry if the timer fires.
        seq: SessionSeq,
        /// Captured pending value.
        value: String,
    },
    /// A pending timer was cancelled before it fired.
    Superseded {
        /// Sequence of the cancelled schedule.
        seq: SessionSeq,
    },
    /// The session connected.
    Opened {
        /// Session sequence.
        seq: SessionSeq,
    },
    /// The outbound value was sent.
    Sent {
        /// Session sequence.
        seq: SessionSeq,
        /// Value that went out.
        value: String,
    },
    /// An inbound message replaced the sink content.
    Delivered {
        /// Session sequence.
        seq: SessionSeq,
        /// Payload length in bytes.
        bytes: usize,
    },
    /// An inbound message was dropped because a newer session already rendered.
    Discarded {
        /// Session sequence of the stale message.
        seq: SessionSeq,
        /// Newest sequence that has rendered.
        latest: SessionSeq,
    },
    /// The session ended normally.
    Closed {
        /// Session sequence.
        seq: SessionSeq,
        /// Messages applied to the sink by this session.
        delivered: u32,
    },
    /// The session ended with an error.
    Failed {
        /// Session sequence.
        seq: SessionSeq,
        /// What went wrong.
        error: DispatchError,
    },
}

impl DispatchEvent {
    /// Sequence of the session or schedule this event is about.
    pub fn seq(&self) -> SessionSeq {
        match self {
            Self::Armed { seq, .. }
            | Self::Superseded { seq }
            | Self::Opened { seq }
            | Self::Sent { seq, .. }
            | Self::Delivered { seq, .. }
            | Self::Discarded { seq, .. }
            | Self::Closed { seq, .. }
            | Self::Failed { seq, .. } => *seq,
        }
    }

    /// Session state this event moves its session into, if any.
    ///
    /// `Armed` and `Superseded` concern the timer, not a session.
    pub fn session_state(&self) -> Option<SessionState> {
        match self {
            Self::Armed { .. } | Self::Superseded { .. } => None,
            Self::Opened { .. } | Self::Sent { .. } | Self::Delivered { .. } | Self::Discarded { .. } => {
                Some(SessionState::Open)
            }
            Self::Closed { .. } => Some(SessionState::Closed),
            Self::Failed { .. } => Some(SessionState::Failed),
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Armed { .. } => "armed",
            Self::Superseded { .. } => "superseded",
            Self::Opened { .. } => "opened",
            Self::Sent { .. } => "sent",
            Self::Delivered { .. } => "delivered",
            Self::Discarded { .. } => "discarded",
            Self::Closed { .. } => "closed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Snapshot of a dispatcher's lifetime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// Calls to notify.
    pub triggers: u64,
    /// Timers cancelled before firing.
    pub superseded: u64,
    /// Sessions that connected.
    pub sessions_opened: u64,
    /// Messages applied to the sink.
    pub delivered: u64,
    /// Stale messages dropped.
    pub discarded: u64,
    /// Sessions that ended with an error.
    pub failures: u64,
}
