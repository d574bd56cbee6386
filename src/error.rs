use crate::program::Space;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("program format error: {0}")]
    ProgramFormat(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("program declares no tables")]
    EmptyProgram,

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("cannot copy from the key register")]
    CopyFromKey,

    #[error("copy source width {src} does not match destination width {dst}")]
    CopyWidthMismatch { src: u32, dst: u32 },

    #[error("copy width {width} overflows a declared field (src {src} bits, dst {dst} bits)")]
    CopyOverflow { width: u32, src: u32, dst: u32 },

    #[error("copy from {src} space to {dst} space is not supported")]
    UnsupportedCopy { src: Space, dst: Space },

    #[error("set cannot target the {0} space")]
    UnsupportedSet(Space),

    #[error("scalar operation of {width} bits is outside the 1..=64 register range")]
    ScalarTooWide { width: u32 },

    #[error("field at bit {pos} with width {width} exceeds a buffer of {len} bytes")]
    FieldOutOfBounds { pos: usize, width: u32, len: usize },

    #[error("advance by {amount} moves the decode cursor (at byte {cursor}) before the packet start")]
    CursorUnderflow { cursor: usize, amount: i64 },

    #[error("goto {0} with unfinished actions in the evaluation queue")]
    GotoWithPendingActions(String),

    #[error("step budget of {budget} exhausted before the program terminated")]
    StepBudgetExceeded { budget: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
