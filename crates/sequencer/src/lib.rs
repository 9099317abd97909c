//! Token-issuing core of the shared log
//!
//! The sequencer is the single point of total ordering: clients obtain
//! globally ordered log positions ("tokens") here before writing, and
//! optimistic transactions are resolved here against per-stream tails.
//!
//! The crate is split the way the state is owned:
//! - [`lease::LeaseManager`] bounds how far the tail may advance before
//!   durable progress is recorded
//! - [`streams::StreamIndex`] carries per-stream tails and back-pointers
//! - [`conflict::ConflictCache`] keeps a bounded history of written
//!   conflict keys
//! - [`Sequencer`] serializes grants over all of the above
//! - [`SequencerService`] wires the core behind a request queue

pub mod config;
pub mod conflict;
pub mod error;
pub mod lease;
pub mod sequencer;
pub mod service;
pub mod streams;

pub use config::SequencerConfig;
pub use error::{Result, SequencerError};
pub use sequencer::Sequencer;
pub use service::{SequencerHandle, SequencerService};
