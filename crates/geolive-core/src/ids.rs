//! Per-dispatcher session sequence numbers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Schedule-time sequence number of a session.
///
/// Every trigger on a dispatcher takes the next number, so a session started
/// by a later trigger always compares greater than one started earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSeq(u64);

impl SessionSeq {
    /// Wrap a raw counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The following sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
