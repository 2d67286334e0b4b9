//! Error types for decoding operations.

use std::fmt;

/// Errors that can occur while decoding a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// An index array referenced a slot outside the value table.
    IndexOutOfRange {
        /// Which index array the bad index came from.
        context: &'static str,
        /// The offending index.
        index: i64,
        /// Length of the value table.
        len: usize,
    },
    /// A run-length color block had a non-positive duration.
    InvalidBlock {
        /// Position of the block within `colorsData`.
        block: usize,
        /// The duration found on the wire.
        duration: i64,
    },
    /// The shell's fields contradict each other.
    InconsistentShell { detail: String },
    /// The decoded output would not fit in memory.
    OutputTooLarge { context: &'static str },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange {
                context,
                index,
                len,
            } => {
                write!(
                    f,
                    "{context} index {index} out of range for value table of length {len}"
                )
            }
            Self::InvalidBlock { block, duration } => {
                write!(f, "color block {block} has invalid duration {duration}")
            }
            Self::InconsistentShell { detail } => write!(f, "inconsistent shell: {detail}"),
            Self::OutputTooLarge { context } => {
                write!(f, "decoded {context} would not fit in memory")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
