//! # geolive-dispatch
//!
//! Debounced request dispatcher over ephemeral WebSocket sessions.
//!
//! A [`Dispatcher`] is bound to one input control, one endpoint, and one
//! output sink. Every [`Dispatcher::notify_input_changed`] call re-arms a
//! quiet-window timer; when the window elapses untouched, a fresh session is
//! opened, the captured value is sent as a single text message, and each
//! reply replaces the sink content. Sessions are closed once their replies
//! are in, on timeout, on error, or as soon as a newer session has rendered.
//!
//! ```no_run
//! use std::sync::Arc;
//! use geolive_core::Endpoint;
//! use geolive_dispatch::{Dispatcher, InputControl, MemorySink};
//!
//! # async fn run() {
//! let control = InputControl::new();
//! let sink = Arc::new(MemorySink::new("countries_stream"));
//! let dispatcher = Dispatcher::new(
//!     "countries",
//!     Endpoint::ws("127.0.0.1", 8000, "/countries"),
//!     Arc::new(control.clone()),
//!     sink.clone(),
//! );
//!
//! control.set("swi");
//! dispatcher.notify_input_changed();
//! dispatcher.wait_idle().await;
//! println!("{}", sink.content());
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod dispatcher;
mod gate;
mod schedule;
mod session;
pub mod sinks;
pub mod sources;
pub mod test_utils;
pub mod transport;
pub mod ws;

pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use sinks::{MemorySink, WriterSink};
pub use sources::InputControl;
pub use transport::{Connector, Session};
pub use ws::WsConnector;
