//! Error types for the shell-loader crate.

use std::fmt;

/// Result type for shell-loader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching and decoding shells.
#[derive(Debug)]
pub enum Error {
    /// HTTP request failed.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The payload could not be parsed.
    MalformedPayload {
        /// Context for where the error occurred.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// Shell decoding failed.
    Decode(shell_decode::DecodeError),
    /// A request named a kind this loader does not handle.
    InvalidRequestKind(String),
    /// No worker has this id.
    UnknownWorker(u32),
    /// The worker has not finished its previous request.
    WorkerBusy(u32),
    /// The worker task has stopped and takes no more requests.
    WorkerStopped(u32),
    /// The other end of a worker channel was dropped.
    ChannelClosed,
}

impl Error {
    /// True for failures of the fetch itself rather than of its payload.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::HttpStatus { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::MalformedPayload { context, message } => {
                write!(f, "malformed {context}: {message}")
            }
            Error::Decode(e) => write!(f, "decode error: {e}"),
            Error::InvalidRequestKind(kind) => write!(f, "invalid request type: {kind}"),
            Error::UnknownWorker(id) => write!(f, "no worker with id {id}"),
            Error::WorkerBusy(id) => write!(f, "worker {id} is still busy"),
            Error::WorkerStopped(id) => write!(f, "worker {id} has stopped"),
            Error::ChannelClosed => write!(f, "worker channel closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<shell_decode::DecodeError> for Error {
    fn from(e: shell_decode::DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedPayload {
            context: "json",
            message: e.to_string(),
        }
    }
}
