//! One dispatch: open, send, receive, close.

use geolive_core::{DispatchError, DispatchEvent, SessionSeq, SessionState};

use crate::dispatcher::Shared;
use crate::gate::Offer;
use crate::transport::Session;

/// Run the session for `seq`, sending `value`.
///
/// The session is closed on every path once it opened. Failures are logged
/// and published; nothing is returned to the caller.
pub(crate) async fn run(shared: &Shared, seq: SessionSeq, value: String) {
    shared.track_session(seq, SessionState::Opening);
    let mut session = match shared.connector.open(&shared.endpoint).await {
        Ok(session) => session,
        Err(error) => {
            fail(shared, seq, error);
            return;
        }
    };
    shared.counters.opened();
    shared.track_session(seq, SessionState::Open);
    shared.publish(DispatchEvent::Opened { seq });
    tracing::debug!(endpoint = %shared.endpoint, "session open");

    let outcome = exchange(shared, seq, &value, session.as_mut()).await;
    let closed = session.close().await;

    match outcome {
        Ok(delivered) => {
            if let Err(error) = closed {
                tracing::debug!(error = %error, "close handshake failed");
            }
            tracing::debug!(delivered, "session closed");
            shared.track_session(seq, SessionState::Closed);
            shared.publish(DispatchEvent::Closed { seq, delivered });
        }
        Err(error) => fail(shared, seq, error),
    }
}

/// Send the value and apply replies until one of the close conditions holds.
/// Returns the number of replies applied to the sink.
async fn exchange(
    shared: &Shared,
    seq: SessionSeq,
    value: &str,
    session: &mut dyn Session,
) -> Result<u32, DispatchError> {
    session.send(value).await?;
    shared.publish(DispatchEvent::Sent {
        seq,
        value: value.to_owned(),
    });

    let config = &shared.config;
    let mut delivered = 0u32;
    while config.max_replies.is_none_or(|max| delivered < max) {
        let next = match tokio::time::timeout(config.reply_timeout, session.next_message()).await {
            Ok(next) => next,
            Err(_) if delivered == 0 => {
                return Err(DispatchError::ReplyTimeout(config.reply_timeout));
            }
            Err(_) => {
                tracing::debug!(delivered, "no further reply, closing");
                break;
            }
        };
        let Some(message) = next else {
            break;
        };
        let markup = message?;

        match shared.gate.offer(seq, &markup, shared.sink.as_ref()) {
            Offer::Applied => {
                delivered += 1;
                shared.counters.delivered();
                shared.publish(DispatchEvent::Delivered {
                    seq,
                    bytes: markup.len(),
                });
            }
            Offer::Stale { latest } => {
                shared.counters.discarded();
                tracing::debug!(latest = latest.get(), "discarding reply from superseded session");
                shared.publish(DispatchEvent::Discarded { seq, latest });
                break;
            }
        }
    }
    Ok(delivered)
}

fn fail(shared: &Shared, seq: SessionSeq, error: DispatchError) {
    shared.counters.failed();
    shared.track_session(seq, SessionState::Failed);
    tracing::warn!(
        endpoint = %shared.endpoint,
        error_kind = error.error_kind(),
        error = %error,
        "session failed"
    );
    shared.publish(DispatchEvent::Failed { seq, error });
}
