//! Wire shapes for sequencer token traffic
//!
//! This crate defines the request and response payloads exchanged with the
//! sequencer. Framing and transport are supplied by the layer that carries
//! them; everything here is plain serde data.

mod messages;
mod responses;

pub use messages::{RequestError, TokenRequest};
pub use responses::TokenResponse;
