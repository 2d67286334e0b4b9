//! Coordinator for a pool of worker units.
//!
//! The coordinator hands out [`WorkRequest`]s by worker id and consumes each
//! worker's event stream. A worker is given new work only after a terminal
//! event for its previous request has been observed here. Events are ordered
//! within a worker; there is no ordering across workers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use tokio::task::JoinHandle;

use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::event::WorkerEvent;
use crate::fetch::Fetcher;
use crate::request::{RequestKind, WorkRequest};
use crate::worker::Worker;

type RecvFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<WorkerEvent, async_channel::RecvError>> + Send + 'a>>;

struct Slot {
    requests: async_channel::Sender<WorkRequest>,
    events: async_channel::Receiver<WorkerEvent>,
    busy: bool,
    stopped: bool,
    task: JoinHandle<()>,
}

impl Slot {
    fn is_idle(&self) -> bool {
        !self.busy && !self.stopped
    }

    fn stop(&mut self, worker_id: u32) {
        if !self.stopped {
            tracing::error!(worker = worker_id, "worker stopped unexpectedly");
        }
        self.busy = false;
        self.stopped = true;
    }
}

/// Dispatches requests to worker units and collects their events.
pub struct Coordinator {
    slots: Vec<Slot>,
}

impl Coordinator {
    /// Spawn `config.worker_count` workers on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn<F: Fetcher + ?Sized + 'static>(fetcher: Arc<F>, config: &LoaderConfig) -> Self {
        let slots = (0..config.worker_count)
            .map(|id| {
                let (request_tx, request_rx) = async_channel::bounded(1);
                let (event_tx, event_rx) = async_channel::bounded(config.event_capacity);
                let worker = Worker::new(id, Arc::clone(&fetcher), event_tx);
                let task = tokio::spawn(worker.serve(request_rx));
                Slot {
                    requests: request_tx,
                    events: event_rx,
                    busy: false,
                    stopped: false,
                    task,
                }
            })
            .collect();

        tracing::info!(workers = config.worker_count, "spawned worker pool");
        Self { slots }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// True if the worker exists, is running and has no request in flight.
    #[must_use]
    pub fn is_idle(&self, worker_id: u32) -> bool {
        self.slot(worker_id).is_ok_and(Slot::is_idle)
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_idle()).count()
    }

    /// Number of workers whose task is still running.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.stopped).count()
    }

    /// True if any worker has a request in flight.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slots.iter().any(|slot| slot.busy)
    }

    /// Hand a request to the worker named by `request.worker_id`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownWorker`] if no worker has that id.
    /// - [`Error::WorkerBusy`] if its previous request has not ended.
    /// - [`Error::WorkerStopped`] if the worker task has stopped.
    pub fn dispatch(&mut self, request: WorkRequest) -> Result<()> {
        let worker_id = request.worker_id;
        let slot = self.slot_mut(worker_id)?;
        if slot.stopped {
            return Err(Error::WorkerStopped(worker_id));
        }
        if slot.busy {
            return Err(Error::WorkerBusy(worker_id));
        }

        match slot.requests.try_send(request) {
            Ok(()) => {}
            Err(async_channel::TrySendError::Full(_)) => return Err(Error::WorkerBusy(worker_id)),
            Err(async_channel::TrySendError::Closed(_)) => {
                slot.stop(worker_id);
                return Err(Error::WorkerStopped(worker_id));
            }
        }
        slot.busy = true;

        tracing::debug!(worker = worker_id, "dispatched request");
        Ok(())
    }

    /// Hand a request to the lowest-numbered idle worker.
    ///
    /// Stopped workers are skipped. Returns the chosen worker id, or `None`
    /// if every running worker is busy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerStopped`] if the chosen worker stopped since
    /// its last event.
    pub fn dispatch_next(&mut self, url: impl Into<String>, kind: RequestKind) -> Result<Option<u32>> {
        let Some(index) = self.slots.iter().position(Slot::is_idle) else {
            return Ok(None);
        };
        let worker_id = u32::try_from(index).map_err(|_| Error::UnknownWorker(u32::MAX))?;
        self.dispatch(WorkRequest::new(url, kind, worker_id))?;
        Ok(Some(worker_id))
    }

    /// Drain every queued event without waiting.
    ///
    /// Events are grouped by worker and in emission order within each worker.
    pub fn poll_events(&mut self) -> Vec<(u32, WorkerEvent)> {
        let mut events = Vec::new();
        for (worker_id, slot) in (0u32..).zip(self.slots.iter_mut()) {
            loop {
                match slot.events.try_recv() {
                    Ok(event) => {
                        observe(slot, &event);
                        events.push((worker_id, event));
                    }
                    Err(async_channel::TryRecvError::Empty) => break,
                    Err(async_channel::TryRecvError::Closed) => {
                        slot.stop(worker_id);
                        break;
                    }
                }
            }
        }
        events
    }

    /// Wait for the next event from one worker.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownWorker`] if no worker has that id.
    /// - [`Error::WorkerStopped`] if the worker task has stopped.
    pub async fn next_event(&mut self, worker_id: u32) -> Result<WorkerEvent> {
        let slot = self.slot_mut(worker_id)?;
        match slot.events.recv().await {
            Ok(event) => {
                observe(slot, &event);
                Ok(event)
            }
            Err(_) => {
                slot.stop(worker_id);
                Err(Error::WorkerStopped(worker_id))
            }
        }
    }

    /// Wait for the next event from any busy worker.
    ///
    /// Returns `None` once no worker has a request in flight and no events
    /// remain queued. A worker whose task ends without a terminal event is
    /// marked stopped and never receives work again.
    pub async fn next_any(&mut self) -> Option<(u32, WorkerEvent)> {
        loop {
            let busy: Vec<u32> = (0u32..)
                .zip(&self.slots)
                .filter(|(_, slot)| slot.busy || !slot.events.is_empty())
                .map(|(id, _)| id)
                .collect();
            if busy.is_empty() {
                return None;
            }

            let (worker_id, result) = {
                let mut pending: Vec<(u32, RecvFuture<'_>)> = busy
                    .iter()
                    .map(|&id| {
                        let receiver = &self.slots[id as usize].events;
                        (id, Box::pin(receiver.recv()) as RecvFuture<'_>)
                    })
                    .collect();

                std::future::poll_fn(|cx| {
                    for (id, recv) in &mut pending {
                        if let Poll::Ready(result) = recv.as_mut().poll(cx) {
                            return Poll::Ready((*id, result));
                        }
                    }
                    Poll::Pending
                })
                .await
            };

            let slot = &mut self.slots[worker_id as usize];
            match result {
                Ok(event) => {
                    observe(slot, &event);
                    return Some((worker_id, event));
                }
                Err(_) => slot.stop(worker_id),
            }
        }
    }

    /// Close every worker's request channel and wait for the tasks to end.
    pub async fn shutdown(self) {
        for slot in self.slots {
            slot.requests.close();
            drop(slot.events);
            if let Err(e) = slot.task.await {
                tracing::error!("worker task failed: {}", e);
            }
        }
    }

    fn slot(&self, worker_id: u32) -> Result<&Slot> {
        self.slots
            .get(worker_id as usize)
            .ok_or(Error::UnknownWorker(worker_id))
    }

    fn slot_mut(&mut self, worker_id: u32) -> Result<&mut Slot> {
        self.slots
            .get_mut(worker_id as usize)
            .ok_or(Error::UnknownWorker(worker_id))
    }
}

/// Free the slot once its request has ended.
fn observe(slot: &mut Slot, event: &WorkerEvent) {
    if event.is_terminal() {
        slot.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Body, OpenFuture, StaticFetcher};

    fn fetcher() -> Arc<StaticFetcher> {
        Arc::new(
            StaticFetcher::new()
                .with_body("/m/a.json", r#"{"id": "a", "points": [0, 0, 0]}"#)
                .with_body("/m/b.json", r#"{"id": "b", "points": [1, 1, 1]}"#)
                .with_body(
                    "/m/batch.json",
                    r#"{"shells": [{"points": [0, 0, 0]}, {"points": [1, 1, 1]}]}"#,
                ),
        )
    }

    async fn drain(coordinator: &mut Coordinator) -> Vec<(u32, WorkerEvent)> {
        let mut events = Vec::new();
        while let Some(event) = coordinator.next_any().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_dispatch_and_collect() {
        let mut coordinator = Coordinator::spawn(fetcher(), &LoaderConfig::default().with_worker_count(2));
        coordinator
            .dispatch(WorkRequest::new("/m/a.json", RequestKind::Shell, 0))
            .unwrap();
        coordinator
            .dispatch(WorkRequest::new("/m/batch.json", RequestKind::Batch, 1))
            .unwrap();
        assert_eq!(coordinator.idle_count(), 0);

        let events = drain(&mut coordinator).await;
        assert!(!coordinator.has_pending());
        assert_eq!(coordinator.idle_count(), 2);

        let of = |id: u32, kind: &str| {
            events
                .iter()
                .filter(|(w, e)| *w == id && e.kind() == kind)
                .count()
        };
        assert_eq!(of(0, "shellLoad"), 1);
        assert_eq!(of(0, "workerFinish"), 1);
        assert_eq!(of(1, "shellLoad"), 2);
        assert_eq!(of(1, "workerFinish"), 1);

        // Within one worker, every shellLoad precedes its finish.
        let batch: Vec<&str> = events
            .iter()
            .filter(|(w, _)| *w == 1)
            .map(|(_, e)| e.kind())
            .filter(|k| *k == "shellLoad" || *k == "workerFinish")
            .collect();
        assert_eq!(batch, vec!["shellLoad", "shellLoad", "workerFinish"]);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_busy_worker_rejected() {
        let mut coordinator = Coordinator::spawn(fetcher(), &LoaderConfig::default().with_worker_count(1));
        coordinator
            .dispatch(WorkRequest::new("/m/a.json", RequestKind::Shell, 0))
            .unwrap();
        let second = coordinator.dispatch(WorkRequest::new("/m/b.json", RequestKind::Shell, 0));
        assert!(matches!(second, Err(Error::WorkerBusy(0))));

        drain(&mut coordinator).await;
        assert!(coordinator.is_idle(0));
        coordinator
            .dispatch(WorkRequest::new("/m/b.json", RequestKind::Shell, 0))
            .unwrap();
        let events = drain(&mut coordinator).await;
        assert!(events.iter().any(|(_, e)| e.kind() == "workerFinish"));

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_worker() {
        let mut coordinator = Coordinator::spawn(fetcher(), &LoaderConfig::default().with_worker_count(1));
        let result = coordinator.dispatch(WorkRequest::new("/m/a.json", RequestKind::Shell, 5));
        assert!(matches!(result, Err(Error::UnknownWorker(5))));
        assert!(!coordinator.is_idle(5));
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_next_fills_idle_slots() {
        let mut coordinator = Coordinator::spawn(fetcher(), &LoaderConfig::default().with_worker_count(2));
        assert_eq!(
            coordinator.dispatch_next("/m/a.json", RequestKind::Shell).unwrap(),
            Some(0)
        );
        assert_eq!(
            coordinator.dispatch_next("/m/b.json", RequestKind::Shell).unwrap(),
            Some(1)
        );
        assert_eq!(
            coordinator.dispatch_next("/m/a.json", RequestKind::Shell).unwrap(),
            None
        );

        drain(&mut coordinator).await;
        assert_eq!(coordinator.idle_count(), 2);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_load_error_frees_slot() {
        let mut coordinator = Coordinator::spawn(fetcher(), &LoaderConfig::default().with_worker_count(1));
        coordinator
            .dispatch(WorkRequest::new("/m/missing.json", RequestKind::Shell, 0))
            .unwrap();

        let event = coordinator.next_event(0).await.unwrap();
        assert_eq!(event.kind(), "loadError");
        assert!(coordinator.is_idle(0));
        assert!(coordinator.poll_events().is_empty());
        coordinator.shutdown().await;
    }

    struct CrashingFetcher(StaticFetcher);

    #[allow(clippy::unused_async)]
    async fn crash(url: &str) -> Result<Box<dyn Body + '_>> {
        panic!("fetch of {url} crashed")
    }

    impl Fetcher for CrashingFetcher {
        fn open<'a>(&'a self, url: &'a str) -> OpenFuture<'a> {
            if url.ends_with("crash.json") {
                Box::pin(crash(url))
            } else {
                self.0.open(url)
            }
        }
    }

    #[tokio::test]
    async fn test_stopped_worker_skipped() {
        let fetcher = Arc::new(CrashingFetcher(
            StaticFetcher::new().with_body("/m/a.json", r#"{"id": "a", "points": [0, 0, 0]}"#),
        ));
        let mut coordinator = Coordinator::spawn(fetcher, &LoaderConfig::default().with_worker_count(2));
        coordinator
            .dispatch(WorkRequest::new("/m/crash.json", RequestKind::Shell, 0))
            .unwrap();

        assert!(drain(&mut coordinator).await.is_empty());
        assert!(!coordinator.has_pending());
        assert!(!coordinator.is_idle(0));
        assert_eq!(coordinator.idle_count(), 1);
        assert_eq!(coordinator.live_count(), 1);

        let again = coordinator.dispatch(WorkRequest::new("/m/a.json", RequestKind::Shell, 0));
        assert!(matches!(again, Err(Error::WorkerStopped(0))));
        assert_eq!(
            coordinator.dispatch_next("/m/a.json", RequestKind::Shell).unwrap(),
            Some(1)
        );
        let events = drain(&mut coordinator).await;
        assert!(events.iter().all(|(w, _)| *w == 1));
        assert!(events.iter().any(|(_, e)| e.kind() == "workerFinish"));
        assert_eq!(
            coordinator.dispatch_next("/m/a.json", RequestKind::Shell).unwrap(),
            Some(1)
        );

        drain(&mut coordinator).await;
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_poll_events_non_blocking() {
        let mut coordinator = Coordinator::spawn(fetcher(), &LoaderConfig::default().with_worker_count(1));
        assert!(coordinator.poll_events().is_empty());

        coordinator
            .dispatch(WorkRequest::new("/m/a.json", RequestKind::Shell, 0))
            .unwrap();
        let mut kinds = Vec::new();
        while coordinator.has_pending() {
            for (_, event) in coordinator.poll_events() {
                kinds.push(event.kind());
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            kinds,
            vec!["loadProgress", "loadComplete", "parseComplete", "shellLoad", "workerFinish"]
        );
        coordinator.shutdown().await;
    }
}
