//! In-memory transport for tests.
//!
//! [`ScriptedConnector`] answers every sent value with a scripted list of
//! delayed replies and records what the dispatcher did, so debounce and
//! ordering behaviour can be asserted under paused tokio time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geolive_core::{DispatchError, Endpoint, Result};
use parking_lot::Mutex;

use crate::transport::{Connector, Session};

/// One scripted inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Wait before this message, counted from the previous one (or the send).
    pub delay: Duration,
    /// Payload, or the reason of a receive failure.
    pub payload: std::result::Result<String, String>,
}

impl Reply {
    /// Message delivered `ms` milliseconds after the previous one.
    pub fn after(ms: u64, payload: impl Into<String>) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            payload: Ok(payload.into()),
        }
    }

    /// Message delivered right away.
    pub fn now(payload: impl Into<String>) -> Self {
        Self::after(0, payload)
    }

    /// Receive failure after `ms` milliseconds.
    pub fn fail_after(ms: u64, reason: impl Into<String>) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            payload: Err(reason.into()),
        }
    }
}

type Responder = dyn Fn(&Endpoint, &str) -> Vec<Reply> + Send + Sync;

#[derive(Default)]
struct Record {
    opened: Vec<Endpoint>,
    sent: Vec<(Endpoint, String)>,
    closed: usize,
}

struct Script {
    responder: Box<Responder>,
    record: Mutex<Record>,
}

/// Connector with scripted replies. Clones share the same record.
#[derive(Clone)]
pub struct ScriptedConnector {
    script: Arc<Script>,
    refuse: bool,
    fail_send: bool,
    connect_delay: Duration,
    hold_open: bool,
}

impl ScriptedConnector {
    /// Connector answering each sent value with `responder(endpoint, value)`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Endpoint, &str) -> Vec<Reply> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(Script {
                responder: Box::new(responder),
                record: Mutex::new(Record::default()),
            }),
            refuse: false,
            fail_send: false,
            connect_delay: Duration::ZERO,
            hold_open: false,
        }
    }

    /// Connector that answers every value with one immediate `<ul>{value}</ul>`.
    pub fn echo() -> Self {
        Self::new(|_, value| vec![Reply::now(format!("<ul>{value}</ul>"))])
    }

    /// Connector whose every open fails with a connection error.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(|_, _| Vec::new())
        }
    }

    /// Connector whose sessions open but reject the outbound value.
    pub fn failing_send() -> Self {
        Self {
            fail_send: true,
            ..Self::new(|_, _| Vec::new())
        }
    }

    /// Delay every handshake by `delay`.
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Keep sessions open after the scripted replies instead of closing from the server side.
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Endpoints of every successful open, in order.
    pub fn opened(&self) -> Vec<Endpoint> {
        self.script.record.lock().opened.clone()
    }

    /// Values sent, in order.
    pub fn sent_values(&self) -> Vec<String> {
        self.script
            .record
            .lock()
            .sent
            .iter()
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Endpoint and value of every send, in order.
    pub fn sent(&self) -> Vec<(Endpoint, String)> {
        self.script.record.lock().sent.clone()
    }

    /// Sessions closed from the client side.
    pub fn closed_count(&self) -> usize {
        self.script.record.lock().closed
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Session>> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.refuse {
            return Err(DispatchError::Connection {
                endpoint: endpoint.url(),
                reason: "connection refused".into(),
            });
        }
        self.script.record.lock().opened.push(endpoint.clone());
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
            endpoint: endpoint.clone(),
            replies: VecDeque::new(),
            hold_open: self.hold_open,
            fail_send: self.fail_send,
            closed: false,
        }))
    }
}

struct ScriptedSession {
    script: Arc<Script>,
    endpoint: Endpoint,
    replies: VecDeque<Reply>,
    hold_open: bool,
    fail_send: bool,
    closed: bool,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send(&mut self, text: &str) -> Result<()> {
        if self.fail_send {
            return Err(DispatchError::Send {
                endpoint: self.endpoint.url(),
                reason: "broken pipe".into(),
            });
        }
        self.script
            .record
            .lock()
            .sent
            .push((self.endpoint.clone(), text.to_owned()));
        self.replies = (self.script.responder)(&self.endpoint, text).into();
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String>> {
        let Some(reply) = self.replies.pop_front() else {
            if self.hold_open && !self.closed {
                std::future::pending::<()>().await;
            }
            return None;
        };
        tokio::time::sleep(reply.delay).await;
        Some(reply.payload.map_err(|reason| DispatchError::Receive {
            endpoint: self.endpoint.url(),
            reason,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.script.record.lock().closed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn endpoint() -> Endpoint {
        Endpoint::ws("127.0.0.1", 8000, "/countries")
    }

    #[tokio::test(start_paused = true)]
    async fn replies_follow_script_delays() {
        let connector = ScriptedConnector::new(|_, value| {
            vec![Reply::after(100, format!("{value}-1")), Reply::after(50, format!("{value}-2"))]
        });
        let mut session = connector.open(&endpoint()).await.unwrap();
        session.send("ch").await.unwrap();

        let start = tokio::time::Instant::now();
        assert_eq!(session.next_message().await.unwrap().unwrap(), "ch-1");
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(session.next_message().await.unwrap().unwrap(), "ch-2");
        assert_eq!(start.elapsed(), Duration::from_millis(150));
        assert!(session.next_message().await.is_none());

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(connector.closed_count(), 1);
        assert_eq!(connector.sent_values(), vec!["ch"]);
    }

    #[tokio::test]
    async fn refusing_connector_records_nothing() {
        let connector = ScriptedConnector::refusing();
        let err = connector.open(&endpoint()).await.err().unwrap();
        assert_matches!(err, DispatchError::Connection { .. });
        assert!(connector.opened().is_empty());
    }

    #[tokio::test]
    async fn scripted_failure_is_receive_error() {
        let connector = ScriptedConnector::new(|_, _| vec![Reply::fail_after(0, "reset")]);
        let mut session = connector.open(&endpoint()).await.unwrap();
        session.send("x").await.unwrap();
        let err = session.next_message().await.unwrap().unwrap_err();
        assert_matches!(err, DispatchError::Receive { reason, .. } if reason == "reset");
    }
}
