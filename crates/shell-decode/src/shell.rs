//! Shell decoding.

use serde::Serialize;

use crate::colors::decompress;
use crate::error::{DecodeError, DecodeResult};
use crate::indices::expand;
use crate::quantize::dequantize;
use crate::wire::{ShellId, ShellJson};

/// Dense per-vertex buffers for one shell.
///
/// Each buffer is a flat `[x,y,z, x,y,z, ...]` sequence. Missing fields are
/// empty, never absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedBuffers {
    pub position: Vec<f32>,
    pub normal: Vec<f32>,
    #[serde(rename = "colors")]
    pub color: Vec<f32>,
}

impl DecodedBuffers {
    /// Number of vertices described by the position buffer.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.position.len() / 3
    }

    /// True if all three buffers are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_empty() && self.normal.is_empty() && self.color.is_empty()
    }

    /// Check buffer shapes.
    ///
    /// Every buffer must be a whole number of triples, and a non-empty normal
    /// buffer must match the position buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InconsistentShell`] describing the first mismatch.
    pub fn validate(&self) -> DecodeResult<()> {
        for (name, buffer) in [
            ("position", &self.position),
            ("normal", &self.normal),
            ("color", &self.color),
        ] {
            if !buffer.len().is_multiple_of(3) {
                return Err(DecodeError::InconsistentShell {
                    detail: format!("{name} length {} is not a multiple of 3", buffer.len()),
                });
            }
        }

        if !self.normal.is_empty() && self.normal.len() != self.position.len() {
            return Err(DecodeError::InconsistentShell {
                detail: format!(
                    "normal length {} does not match position length {}",
                    self.normal.len(),
                    self.position.len()
                ),
            });
        }

        Ok(())
    }
}

/// A decoded shell together with its producer-assigned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedShell {
    pub id: Option<ShellId>,
    pub buffers: DecodedBuffers,
}

impl DecodedShell {
    /// Decode a wire shell, keeping its identifier.
    ///
    /// # Errors
    ///
    /// See [`decode_shell`].
    pub fn decode(mut shell: ShellJson) -> DecodeResult<Self> {
        let id = shell.id.take();
        let buffers = decode_shell(shell)?;
        Ok(Self { id, buffers })
    }
}

/// Decode one shell from its wire form into dense buffers.
///
/// The value table is dequantized first, then points, normals and colors
/// are reconstructed independently. Index arrays and the table are dropped
/// once the buffers are built.
///
/// # Errors
///
/// - [`DecodeError::IndexOutOfRange`] if an index array points outside the table.
/// - [`DecodeError::InvalidBlock`] if a color block has a non-positive duration.
/// - [`DecodeError::InconsistentShell`] if a field has more than one
///   representation, or the resulting buffers disagree in shape.
pub fn decode_shell(shell: ShellJson) -> DecodeResult<DecodedBuffers> {
    let ShellJson {
        id: _,
        precision,
        values,
        points_index,
        normals_index,
        colors_index,
        colors_data,
        points,
        normals,
        colors,
    } = shell;

    let mut values = values.unwrap_or_default();
    if let Some(precision) = precision {
        dequantize(&mut values, precision);
    }

    let points = unindex(&values, points_index, points, "points")?;
    let normals = unindex(&values, normals_index, normals, "normals")?;

    let colors = match (colors_index, colors_data) {
        (Some(_), Some(_)) => {
            return Err(DecodeError::InconsistentShell {
                detail: "both colorsIndex and colorsData are present".to_string(),
            });
        }
        (None, Some(blocks)) => {
            if colors.is_some() {
                return Err(DecodeError::InconsistentShell {
                    detail: "both colors and colorsData are present".to_string(),
                });
            }
            decompress(&blocks)?
        }
        (index, None) => unindex(&values, index, colors, "colors")?,
    };
    drop(values);

    let buffers = DecodedBuffers {
        position: to_f32(&points),
        normal: to_f32(&normals),
        color: to_f32(&colors),
    };
    buffers.validate()?;

    Ok(buffers)
}

/// Resolve one field from either its index array or its expanded form.
fn unindex(
    values: &[f64],
    index: Option<Vec<i64>>,
    expanded: Option<Vec<f64>>,
    context: &'static str,
) -> DecodeResult<Vec<f64>> {
    match (index, expanded) {
        (Some(_), Some(_)) => Err(DecodeError::InconsistentShell {
            detail: format!("{context} has both an index array and expanded values"),
        }),
        (Some(index), None) => expand(values, &index, context),
        (None, Some(expanded)) => Ok(expanded),
        (None, None) => Ok(Vec::new()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}
