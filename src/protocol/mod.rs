//! Network protocol framing
//!
//! Minimal zero-copy parsers for the Ethernet/IPv4/TCP framing the packet
//! classifier walks. Deep protocol semantics (checksums, fragmentation,
//! options) are out of scope; only header boundaries and the handful of
//! fields classification needs are exposed.

pub mod ethernet;
pub mod ipv4;
pub mod tcp;
pub mod types;

pub use types::*;
