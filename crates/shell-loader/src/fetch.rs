//! Byte fetching abstractions.
//!
//! Workers do not talk to the network directly; they go through a
//! [`Fetcher`], which opens a URL and yields its body chunk by chunk so that
//! progress can be reported while bytes are still arriving.
//!
//! # Implementations
//!
//! - [`HttpFetcher`]: HTTP(S) via `reqwest`
//! - [`StaticFetcher`]: Serves canned bodies from memory

use std::{collections::HashMap, future::Future, pin::Pin};

use crate::error::{Error, Result};

/// Future type for opening a body.
pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = Result<Box<dyn Body + 'a>>> + Send + 'a>>;

/// Future type for reading the next chunk of a body.
pub type ChunkFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>>;

/// A source of payload bytes, keyed by URL.
pub trait Fetcher: Send + Sync {
    /// Start fetching `url`.
    ///
    /// Fails with [`Error::HttpStatus`] for a non-success status (including
    /// 404) and [`Error::Http`] if the request could not be made.
    fn open<'a>(&'a self, url: &'a str) -> OpenFuture<'a>;
}

/// A response body being received.
pub trait Body: Send {
    /// Total body length in bytes, if the source announced it.
    fn content_length(&self) -> Option<u64>;

    /// Receive the next chunk, or `None` once the body is complete.
    fn chunk(&mut self) -> ChunkFuture<'_>;
}

/// Fetches over HTTP(S) with `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl HttpFetcher {
    /// Create a new fetcher with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new fetcher around an existing HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: None,
        }
    }

    /// Resolve relative request URLs against `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The absolute URL that will be fetched for `url`.
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.contains("://") => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            }
            _ => url.to_string(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn open<'a>(&'a self, url: &'a str) -> OpenFuture<'a> {
        Box::pin(async move {
            let resolved = self.resolve(url);
            tracing::debug!(url = %resolved, "fetching");

            let response = self
                .http
                .get(&resolved)
                .send()
                .await
                .map_err(|e| Error::Http {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            Ok(Box::new(HttpBody {
                url: url.to_string(),
                response,
            }) as Box<dyn Body + 'a>)
        })
    }
}

struct HttpBody {
    url: String,
    response: reqwest::Response,
}

impl Body for HttpBody {
    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move {
            let chunk = self.response.chunk().await.map_err(|e| Error::Http {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
            Ok(chunk.map(|bytes| bytes.to_vec()))
        })
    }
}

/// Serves bodies from memory.
///
/// Unknown URLs answer with status 404. Bodies are delivered in chunks of
/// `chunk_size` bytes so that progress reporting can be exercised without a
/// server.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
    chunk_size: usize,
    announce_length: bool,
    fail_after: Option<usize>,
}

impl StaticFetcher {
    /// Create an empty fetcher that delivers each body in one chunk.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            chunk_size: usize::MAX,
            announce_length: true,
            fail_after: None,
        }
    }

    /// Register a body for `url`.
    #[must_use]
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Deliver bodies in chunks of at most `chunk_size` bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Withhold the content length, as a chunked HTTP response would.
    #[must_use]
    pub fn without_length(mut self) -> Self {
        self.announce_length = false;
        self
    }

    /// Drop the connection after `chunks` chunks of every body.
    #[must_use]
    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for StaticFetcher {
    fn open<'a>(&'a self, url: &'a str) -> OpenFuture<'a> {
        let result = match self.bodies.get(url) {
            Some(body) => Ok(Box::new(StaticBody {
                url,
                remaining: body.as_slice(),
                delivered: 0,
                fail_after: self.fail_after,
                total: self.announce_length.then_some(body.len() as u64),
                chunk_size: self.chunk_size,
            }) as Box<dyn Body + 'a>),
            None => Err(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        };
        Box::pin(async move { result })
    }
}

struct StaticBody<'a> {
    url: &'a str,
    remaining: &'a [u8],
    delivered: usize,
    fail_after: Option<usize>,
    total: Option<u64>,
    chunk_size: usize,
}

impl Body for StaticBody<'_> {
    fn content_length(&self) -> Option<u64> {
        self.total
    }

    fn chunk(&mut self) -> ChunkFuture<'_> {
        let result = if self.fail_after.is_some_and(|n| self.delivered >= n) {
            Err(Error::Http {
                url: self.url.to_string(),
                message: "connection reset".to_string(),
            })
        } else if self.remaining.is_empty() {
            Ok(None)
        } else {
            let (head, tail) = self
                .remaining
                .split_at(self.chunk_size.min(self.remaining.len()));
            self.remaining = tail;
            self.delivered += 1;
            Ok(Some(head.to_vec()))
        };
        Box::pin(async move { result })
    }
}
