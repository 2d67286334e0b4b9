//! Run-length color decompression.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};

/// A run of identically colored vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorBlock {
    /// RGB color shared by every vertex in the run.
    #[serde(rename = "data", alias = "color")]
    pub color: [f64; 3],
    /// Number of consecutive vertices carrying `color`.
    pub duration: i64,
}

impl ColorBlock {
    /// Create a new color block.
    #[must_use]
    pub fn new(color: [f64; 3], duration: i64) -> Self {
        Self { color, duration }
    }
}

/// Expand run-length color blocks into a flat `[r,g,b, r,g,b, ...]` sequence.
///
/// Blocks are concatenated in order; each contributes `3 * duration` values.
///
/// # Errors
///
/// - [`DecodeError::InvalidBlock`] if any block has a duration of zero or less.
/// - [`DecodeError::OutputTooLarge`] if the expanded colors cannot be allocated.
pub fn decompress(blocks: &[ColorBlock]) -> DecodeResult<Vec<f64>> {
    const TOO_LARGE: DecodeError = DecodeError::OutputTooLarge { context: "colors" };

    let mut total = 0usize;
    for (block_index, block) in blocks.iter().enumerate() {
        if block.duration <= 0 {
            return Err(DecodeError::InvalidBlock {
                block: block_index,
                duration: block.duration,
            });
        }
        let duration = usize::try_from(block.duration).map_err(|_| TOO_LARGE)?;
        total = total.checked_add(duration).ok_or(TOO_LARGE)?;
    }
    let len = total.checked_mul(3).ok_or(TOO_LARGE)?;

    // Durations come off the wire, so the reservation must be fallible.
    let mut colors = Vec::new();
    colors.try_reserve_exact(len).map_err(|_| TOO_LARGE)?;
    for block in blocks {
        for _ in 0..block.duration {
            colors.extend_from_slice(&block.color);
        }
    }

    Ok(colors)
}
