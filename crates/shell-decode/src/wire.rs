//! JSON wire representation of shells and batches.
//!
//! These types mirror the payloads served to the viewer. Every field is
//! optional: a shell carries whichever representation its producer chose.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::colors::ColorBlock;

/// Identifier attached to a shell by its producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShellId {
    Text(String),
    Number(i64),
}

impl fmt::Display for ShellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A single shell as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellJson {
    pub id: Option<ShellId>,
    /// Decimal scale applied to `values` as `value / 10^precision`.
    pub precision: Option<u32>,
    /// Deduplicated value table shared by the index arrays.
    pub values: Option<Vec<f64>>,
    pub points_index: Option<Vec<i64>>,
    pub normals_index: Option<Vec<i64>>,
    pub colors_index: Option<Vec<i64>>,
    /// Run-length encoded per-vertex colors.
    pub colors_data: Option<Vec<ColorBlock>>,
    // Already-expanded arrays.
    pub points: Option<Vec<f64>>,
    pub normals: Option<Vec<f64>>,
    pub colors: Option<Vec<f64>>,
}

/// A batch of shells delivered in one payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchJson {
    pub shells: Vec<ShellJson>,
}
