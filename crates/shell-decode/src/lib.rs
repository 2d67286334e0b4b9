//! Decode compressed CAD shell meshes into dense vertex buffers.
//!
//! This crate provides pure synchronous decoding for the shell wire format:
//! quantized value tables, per-field index arrays, and run-length encoded
//! colors. Nothing here performs I/O or suspends; callers decide how to
//! parallelize.
//!
//! # Pipeline
//!
//! 1. [`dequantize`] the shared value table by `10^precision`
//! 2. [`expand`] points, normals and colors from their index arrays
//! 3. [`decompress`] run-length color blocks
//! 4. Convert to `f32` [`DecodedBuffers`]
//!
//! # Example
//!
//! ```
//! use shell_decode::{ShellJson, decode_shell};
//!
//! let shell: ShellJson = serde_json::from_str(
//!     r#"{"values": [0, 10], "precision": 1, "pointsIndex": [0, 0, 0, 1, 0, 0]}"#,
//! ).unwrap();
//! let buffers = decode_shell(shell).unwrap();
//! assert_eq!(buffers.position, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
//! ```

mod batch;
mod colors;
mod error;
mod indices;
mod quantize;
mod shell;
mod wire;

pub use batch::decode_batch;
pub use colors::{ColorBlock, decompress};
pub use error::{DecodeError, DecodeResult};
pub use indices::expand;
pub use quantize::{dequantize, quantize, scale_factor};
pub use shell::{DecodedBuffers, DecodedShell, decode_shell};
pub use wire::{BatchJson, ShellId, ShellJson};
