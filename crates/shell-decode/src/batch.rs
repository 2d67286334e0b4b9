//! Batch decoding.

use crate::error::DecodeResult;
use crate::shell::DecodedShell;
use crate::wire::BatchJson;

/// Decode every shell in a batch, in document order.
///
/// Decoding stops at the first failing shell and no shells are returned, so
/// a caller never receives part of a batch.
///
/// # Errors
///
/// Returns the first shell's decode error.
pub fn decode_batch(batch: BatchJson) -> DecodeResult<Vec<DecodedShell>> {
    batch.shells.into_iter().map(DecodedShell::decode).collect()
}
