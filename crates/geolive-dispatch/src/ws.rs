//! WebSocket transport over `tokio-tungstenite`.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use geolive_core::{DispatchError, Endpoint, Result, Scheme};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::transport::{Connector, Session};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a plain WebSocket connection per session.
#[derive(Clone, Debug, Default)]
pub struct WsConnector {
    connect_timeout: Option<Duration>,
}

impl WsConnector {
    /// Connector without a handshake timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on a handshake that takes longer than `timeout`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Session>> {
        if endpoint.scheme() == Scheme::Wss {
            install_crypto_provider();
        }
        let url = endpoint.url();
        let connect = connect_async(url.as_str());
        let connected = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| DispatchError::ConnectTimeout(limit))?,
            None => connect.await,
        };
        let (stream, _response) = connected.map_err(|e| DispatchError::Connection {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;

        tracing::trace!(endpoint = %url, "websocket handshake complete");
        Ok(Box::new(WsSession {
            endpoint: url,
            stream,
            closed: false,
        }))
    }
}

/// rustls needs a process-wide crypto provider before the first TLS handshake.
/// Installing it again is a no-op error.
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// A connected WebSocket session.
pub struct WsSession {
    endpoint: String,
    stream: WsStream,
    closed: bool,
}

#[async_trait]
impl Session for WsSession {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| DispatchError::Send {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })
    }

    async fn next_message(&mut self) -> Option<Result<String>> {
        if self.closed {
            return None;
        }
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!(endpoint = %self.endpoint, bytes = data.len(), "skipping non-UTF-8 binary frame");
                    }
                },
                Ok(Message::Close(_)) => {
                    self.closed = true;
                    return None;
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.closed = true;
                    return None;
                }
                Err(e) => {
                    return Some(Err(DispatchError::Receive {
                        endpoint: self.endpoint.clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(DispatchError::Receive {
                endpoint: self.endpoint.clone(),
                reason: format!("close: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint::ws("127.0.0.1", port, "/countries");
        let err = WsConnector::new()
            .with_connect_timeout(Duration::from_secs(5))
            .open(&endpoint)
            .await
            .err()
            .expect("nothing listens on the port");
        assert_matches!(err, DispatchError::Connection { endpoint, .. } if endpoint.ends_with("/countries"));
    }

    #[tokio::test]
    async fn wss_attempts_tls_handshake() {
        // Accept and hang up: the TLS handshake fails, but it is attempted.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        }));

        let endpoint = Endpoint::new(Scheme::Wss, "127.0.0.1", port, "/countries");
        let err = WsConnector::new()
            .with_connect_timeout(Duration::from_secs(5))
            .open(&endpoint)
            .await
            .err()
            .expect("no TLS server on the port");
        assert_matches!(
            err,
            DispatchError::Connection { endpoint, reason }
                if endpoint.starts_with("wss://") && !reason.contains("not compiled")
        );
    }

    #[tokio::test]
    async fn stalled_handshake_hits_connect_timeout() {
        // Accept the TCP connection but never answer the upgrade request.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let limit = Duration::from_millis(200);
        let err = WsConnector::new()
            .with_connect_timeout(limit)
            .open(&Endpoint::ws("127.0.0.1", port, "/units"))
            .await
            .err()
            .expect("handshake never completes");
        assert_eq!(err, DispatchError::ConnectTimeout(limit));
        assert_eq!(err.error_kind(), "connect_timeout");
        server.abort();
    }
}
