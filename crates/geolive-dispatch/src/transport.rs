//! Session transport abstraction.
//!
//! A [`Connector`] opens one [`Session`] per dispatch. A session is used for
//! exactly one [`Session::send`], any number of [`Session::next_message`]
//! calls, and a final [`Session::close`].

use async_trait::async_trait;
use geolive_core::{Endpoint, Result};

/// Opens sessions to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and complete the handshake.
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Session>>;
}

/// One ephemeral bidirectional text channel.
#[async_trait]
pub trait Session: Send {
    /// Send one text message.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Next inbound text message; `None` once the remote end has closed.
    async fn next_message(&mut self) -> Option<Result<String>>;

    /// Close from our side. Closing an already closed session is not an error.
    async fn close(&mut self) -> Result<()>;
}
