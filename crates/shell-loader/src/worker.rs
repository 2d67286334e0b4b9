//! Worker units.
//!
//! A [`Worker`] owns one in-flight request at a time and drives it through
//! `Idle → Fetching → Parsing → Decoding → Finished`, or into `Failed`.
//! Every step is reported on the worker's own event channel, in order.
//! The only suspension points are the fetch and the event sends; decoding
//! runs synchronously on already-received bytes.

use std::sync::Arc;

use shell_decode::{BatchJson, DecodedShell, ShellJson, decode_batch};

use crate::error::{Error, Result};
use crate::event::{ShellData, WorkerEvent, file_name, is_markup};
use crate::fetch::Fetcher;
use crate::request::{RequestKind, WorkRequest};

/// Lifecycle of a worker's current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No request bound.
    Idle,
    /// Waiting for bytes.
    Fetching,
    /// Bytes received; interpreting the payload.
    Parsing,
    /// Rebuilding dense buffers.
    Decoding,
    /// All results delivered.
    Finished,
    /// The request failed and an error event was delivered.
    Failed,
}

impl WorkerState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// An independently scheduled fetch-and-decode unit.
pub struct Worker<F: Fetcher + ?Sized> {
    id: u32,
    fetcher: Arc<F>,
    events: async_channel::Sender<WorkerEvent>,
    state: WorkerState,
}

impl<F: Fetcher + ?Sized> Worker<F> {
    /// Create a worker that reports to `events`.
    #[must_use]
    pub fn new(id: u32, fetcher: Arc<F>, events: async_channel::Sender<WorkerEvent>) -> Self {
        Self {
            id,
            fetcher,
            events,
            state: WorkerState::Idle,
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Process requests from `requests` until it is closed.
    ///
    /// Returns early if the event channel is closed.
    pub async fn serve(mut self, requests: async_channel::Receiver<WorkRequest>) {
        while let Ok(request) = requests.recv().await {
            if let Err(e) = self.run(request).await {
                tracing::debug!(worker = self.id, "stopping: {}", e);
                return;
            }
        }
        tracing::debug!(worker = self.id, "request channel closed");
    }

    /// Run one request to a terminal state.
    ///
    /// Fetch, parse and decode failures are reported as events and yield
    /// `Ok(WorkerState::Failed)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the event channel has no receiver.
    pub async fn run(&mut self, request: WorkRequest) -> Result<WorkerState> {
        if request.worker_id != self.id {
            tracing::warn!(
                worker = self.id,
                requested = request.worker_id,
                "request addressed to another worker"
            );
        }

        self.transition(WorkerState::Idle);
        self.transition(WorkerState::Fetching);
        let file = file_name(&request.url).to_string();

        let bytes = match self.fetch(&request.url, &file).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_transport() => {
                tracing::warn!(worker = self.id, "failed to load {}: {}", request.url, e);
                self.emit(WorkerEvent::LoadError {
                    url: request.url,
                    file,
                    worker_id: self.id,
                })
                .await?;
                self.transition(WorkerState::Failed);
                return Ok(self.state);
            }
            Err(e) => return Err(e),
        };

        self.emit(WorkerEvent::LoadComplete { file: file.clone() })
            .await?;
        self.transition(WorkerState::Parsing);

        match self.process(&request, &file, bytes).await {
            Ok(()) => self.transition(WorkerState::Finished),
            Err(Error::ChannelClosed) => return Err(Error::ChannelClosed),
            Err(e) => {
                tracing::warn!(worker = self.id, "failed to process {}: {}", request.url, e);
                self.emit(WorkerEvent::PayloadError {
                    url: request.url,
                    file,
                    worker_id: self.id,
                })
                .await?;
                self.transition(WorkerState::Failed);
            }
        }

        Ok(self.state)
    }

    /// Receive the whole body, reporting progress per chunk.
    async fn fetch(&self, url: &str, file: &str) -> Result<Vec<u8>> {
        let mut body = self.fetcher.open(url).await?;
        let total = body.content_length().filter(|&t| t > 0);
        let mut data = Vec::with_capacity(total.map_or(0, |t| usize::try_from(t).unwrap_or(0)));

        while let Some(chunk) = body.chunk().await? {
            data.extend_from_slice(&chunk);
            #[allow(clippy::cast_precision_loss)]
            let percent = total.map(|t| data.len() as f64 / t as f64 * 100.0);
            self.emit(WorkerEvent::LoadProgress {
                file: file.to_string(),
                percent,
            })
            .await?;
        }

        Ok(data)
    }

    /// Dispatch received bytes by request kind.
    async fn process(&mut self, request: &WorkRequest, file: &str, bytes: Vec<u8>) -> Result<()> {
        let url = request.url.as_str();
        match request.kind {
            RequestKind::Assembly => {
                let data = into_text(bytes, "assembly")?;
                self.emit(WorkerEvent::RootLoad {
                    url: url.to_string(),
                    data,
                    worker_id: self.id,
                })
                .await
            }
            RequestKind::Annotation => {
                let data = into_text(bytes, "annotation")?;
                self.emit(WorkerEvent::AnnotationLoad {
                    url: url.to_string(),
                    file: file.to_string(),
                    data,
                    worker_id: self.id,
                })
                .await
            }
            RequestKind::Shell if is_markup(url) => {
                let data = into_text(bytes, "shell markup")?;
                self.emit(WorkerEvent::ShellLoad {
                    url: Some(url.to_string()),
                    file: file.to_string(),
                    data: ShellData::Markup(data),
                    id: None,
                    worker_id: self.id,
                })
                .await?;
                self.finish().await
            }
            RequestKind::Shell => {
                let shell: ShellJson = serde_json::from_slice(&bytes)?;
                drop(bytes);
                self.emit(WorkerEvent::ParseComplete {
                    file: file.to_string(),
                })
                .await?;

                self.transition(WorkerState::Decoding);
                let decoded = DecodedShell::decode(shell)?;
                self.emit_shell(url, file, decoded).await?;
                self.finish().await
            }
            RequestKind::Batch if is_markup(url) => Err(Error::MalformedPayload {
                context: "batch",
                message: "markup batches are not supported".to_string(),
            }),
            RequestKind::Batch => {
                let batch: BatchJson = serde_json::from_slice(&bytes)?;
                drop(bytes);

                // The whole batch decodes before anything is sent, so a bad
                // shell never leaves the viewer with part of a batch.
                self.transition(WorkerState::Decoding);
                let shells = decode_batch(batch)?;
                tracing::debug!(worker = self.id, count = shells.len(), "decoded batch");
                for decoded in shells {
                    self.emit(WorkerEvent::ParseComplete {
                        file: file.to_string(),
                    })
                    .await?;
                    self.emit_shell(url, file, decoded).await?;
                }
                self.finish().await
            }
        }
    }

    async fn emit_shell(&self, url: &str, file: &str, decoded: DecodedShell) -> Result<()> {
        self.emit(WorkerEvent::ShellLoad {
            url: Some(url.to_string()),
            file: file.to_string(),
            data: ShellData::Decoded(decoded.buffers),
            id: decoded.id,
            worker_id: self.id,
        })
        .await
    }

    async fn finish(&self) -> Result<()> {
        self.emit(WorkerEvent::WorkerFinish { worker_id: self.id })
            .await
    }

    async fn emit(&self, event: WorkerEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    fn transition(&mut self, next: WorkerState) {
        tracing::debug!(worker = self.id, from = ?self.state, to = ?next, "state change");
        self.state = next;
    }
}

fn into_text(bytes: Vec<u8>, context: &'static str) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::MalformedPayload {
        context,
        message: e.to_string(),
    })
}
