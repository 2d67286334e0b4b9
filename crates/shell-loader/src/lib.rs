//! Concurrent fetch-and-decode workers for progressive CAD shell loading.
//!
//! A [`Coordinator`] owns a pool of [`Worker`]s. Each worker takes one
//! [`WorkRequest`] at a time, fetches its bytes through a [`Fetcher`],
//! decodes shells with `shell_decode`, and streams [`WorkerEvent`]s back.
//!
//! # Design principles
//!
//! - **One request per worker**: a slot is reused only after its terminal event
//! - **Ordered per worker**: no ordering is promised across workers
//! - **Errors become events**: fetch and payload failures never escape a worker
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shell_loader::{Coordinator, HttpFetcher, LoaderConfig, RequestKind};
//!
//! # async fn run() -> shell_loader::Result<()> {
//! let fetcher = Arc::new(HttpFetcher::new().with_base_url("http://localhost:8080/models"));
//! let mut coordinator = Coordinator::spawn(fetcher, &LoaderConfig::default());
//!
//! coordinator.dispatch_next("cube/batch_0.json", RequestKind::Batch)?;
//! while let Some((worker_id, event)) = coordinator.next_any().await {
//!     println!("{worker_id}: {}", event.kind());
//! }
//! coordinator.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
pub mod event;
pub mod fetch;
mod request;
mod worker;

pub use config::{DEFAULT_WORKER_COUNT, LoaderConfig};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use event::{ShellData, WorkerEvent};
pub use fetch::{Fetcher, HttpFetcher, StaticFetcher};
pub use request::{RequestKind, WorkRequest};
pub use worker::{Worker, WorkerState};

// Re-export decode types for convenience.
pub use shell_decode::{DecodedBuffers, ShellId};
