//! # geolive-core
//!
//! Foundation types shared by every geolive crate:
//!
//! - **Endpoints**: [`Endpoint`] identifies the remote channel a dispatcher talks to
//! - **Sequence numbers**: [`SessionSeq`] tags each scheduled session
//! - **States and events**: [`DispatcherState`], [`SessionState`], [`DispatchEvent`]
//! - **Capabilities**: [`ValueSource`] and [`OutputSink`] at the UI seam
//! - **Errors**: [`DispatchError`] and [`EndpointError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod endpoint;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod state;
pub mod traits;

pub use endpoint::{Endpoint, Scheme};
pub use errors::{DispatchError, EndpointError, Result};
pub use events::{DispatchEvent, DispatchStats};
pub use ids::SessionSeq;
pub use state::{DeliveryOrder, DispatcherState, SessionState};
pub use traits::{OutputSink, ValueSource};
