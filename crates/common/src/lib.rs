//! Common types for the tokenlog sequencer
//!
//! This crate defines:
//! - Stream identifiers (opaque 128-bit ids, uuid-backed)
//! - Global log position sentinels

mod position;
mod stream_id;

pub use position::{NO_POSITION, TOKEN_ABORTED};
pub use stream_id::StreamId;
