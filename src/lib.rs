//! Pipevm - match-action pipeline evaluator
//!
//! Executes a compiled match-action program (tables of preparation actions
//! and keyed rules) against a single Ethernet/IPv4/TCP packet, producing a
//! mutated packet buffer and an egress decision.

pub mod bits;
pub mod error;
pub mod eval;
pub mod packet;
pub mod program;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
