//! Global log position sentinels
//!
//! Positions in the global log are signed 64-bit. The protocol overloads
//! `-1`: in response maps it means "no entry recorded", in the token field
//! it means "transaction aborted". Both sentinels are named so call sites
//! read as the meaning they carry.

/// Sentinel for an absent position in stream-tail and back-pointer maps.
pub const NO_POSITION: i64 = -1;

/// Token value signalling that a transaction was aborted at resolution.
pub const TOKEN_ABORTED: i64 = -1;
