//! Inbound work requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What a request's payload is and how the worker should process it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Root assembly description, passed through untouched.
    Assembly,
    /// Annotation data, passed through untouched.
    Annotation,
    /// A single shell.
    Shell,
    /// Several shells in one payload.
    Batch,
}

impl RequestKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assembly => "assembly",
            Self::Annotation => "annotation",
            Self::Shell => "shell",
            Self::Batch => "batch",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "assembly" => Ok(Self::Assembly),
            "annotation" => Ok(Self::Annotation),
            "shell" => Ok(Self::Shell),
            "batch" => Ok(Self::Batch),
            other => Err(Error::InvalidRequestKind(other.to_string())),
        }
    }
}

/// A single fetch-and-decode job for one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkRequest {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(rename = "workerID")]
    pub worker_id: u32,
}

/// The request message as it arrives, before its kind is checked.
#[derive(Deserialize)]
struct RawRequest {
    url: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "workerID")]
    worker_id: u32,
}

impl WorkRequest {
    /// Create a new request.
    #[must_use]
    pub fn new(url: impl Into<String>, kind: RequestKind, worker_id: u32) -> Self {
        Self {
            url: url.into(),
            kind,
            worker_id,
        }
    }

    /// Parse an inbound `{ url, workerID, type }` message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the message is not valid JSON of
    /// that shape, or [`Error::InvalidRequestKind`] for an unknown `type`.
    pub fn from_json(message: &str) -> Result<Self> {
        let raw: RawRequest = serde_json::from_str(message)?;
        Ok(Self {
            url: raw.url,
            kind: raw.kind.parse()?,
            worker_id: raw.worker_id,
        })
    }
}
