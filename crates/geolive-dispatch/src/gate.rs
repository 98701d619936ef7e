//! Serialises sink writes and enforces the delivery order.

use geolive_core::{DeliveryOrder, OutputSink, SessionSeq};
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Offer {
    Applied,
    Stale { latest: SessionSeq },
}

pub(crate) struct DeliveryGate {
    order: DeliveryOrder,
    /// Highest sequence that has rendered at least once.
    latest: Mutex<Option<SessionSeq>>,
}

impl DeliveryGate {
    pub fn new(order: DeliveryOrder) -> Self {
        Self {
            order,
            latest: Mutex::new(None),
        }
    }

    /// Render `markup` from session `seq` unless the order policy rejects it.
    ///
    /// The staleness check and the render happen under one lock.
    pub fn offer(&self, seq: SessionSeq, markup: &str, sink: &dyn OutputSink) -> Offer {
        let mut latest = self.latest.lock();
        if self.order == DeliveryOrder::LatestWins {
            if let Some(newest) = *latest {
                if seq < newest {
                    return Offer::Stale { latest: newest };
                }
            }
        }
        sink.render(markup);
        *latest = Some(latest.map_or(seq, |newest| newest.max(seq)));
        Offer::Applied
    }
}
