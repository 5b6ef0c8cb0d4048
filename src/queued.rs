//! Write-behind decorator over a [`Store`]
//!
//! `QueuedStore` accepts entries without blocking the instrumented
//! request path and moves them into durable storage from a background
//! flush task:
//! - ingest appends to an in-memory FIFO and returns immediately
//! - a periodic tick drains an adaptively sized batch into the store
//! - `stop()` disarms the timer and drains whatever is left, so a clean
//!   shutdown loses nothing
//!
//! Reads bypass the queue entirely; queued-but-unflushed entries are not
//! visible yet. That eventual-consistency window is the accepted price
//! of never stalling producers.

use crate::entry::{Entry, EntryKind, NewEntry};
use crate::error::Result;
use crate::queue::IngestQueue;
use crate::store::{Page, PageRequest, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Queue and flush tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct QueuedStoreConfig {
    /// Nominal entries per flush
    pub batch_size: usize,
    /// Flush timer period
    pub process_interval: Duration,
    /// Queue depth above which a warning is logged
    pub warn_threshold: usize,
    /// Pre-reserve queue capacity to avoid reallocation under load
    pub preallocate: bool,
}

impl Default for QueuedStoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            process_interval: Duration::from_millis(100),
            warn_threshold: 100_000,
            preallocate: true,
        }
    }
}

struct FlushWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Non-blocking ingestion facade plus read-side delegation.
pub struct QueuedStore<S: Store> {
    store: Arc<S>,
    queue: Arc<IngestQueue>,
    config: QueuedStoreConfig,
    worker: tokio::sync::Mutex<Option<FlushWorker>>,
}

impl<S: Store + 'static> QueuedStore<S> {
    pub fn new(store: Arc<S>, config: QueuedStoreConfig) -> Self {
        let queue = Arc::new(IngestQueue::new(config.warn_threshold, config.preallocate));
        Self {
            store,
            queue,
            config,
            worker: tokio::sync::Mutex::new(None),
        }
    }

    /// Queue an entry for persistence and return immediately. The entry
    /// becomes visible to readers only after a flush tick (or shutdown
    /// drain) has inserted it.
    pub fn save(&self, entry: NewEntry) {
        self.queue.push(entry);
    }

    /// Current number of queued, not-yet-flushed entries.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Arm the periodic flush task. Idempotent: re-arming stops any
    /// existing worker cooperatively first, so a batch already drained
    /// from the queue finishes inserting before the new timer takes
    /// over. Queued entries are untouched either way.
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(old) = worker.take() {
            let _ = old.shutdown.send(true);
            let _ = old.handle.await;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let queue = Arc::clone(&self.queue);
        let batch_size = self.config.batch_size;
        let period = self.config.process_interval;

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        flush_batch(store.as_ref(), &queue, batch_size).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        *worker = Some(FlushWorker { shutdown, handle });
    }

    /// Disarm the flush timer and drain everything still queued into the
    /// store. An in-flight flush batch is allowed to finish first; this
    /// is a cooperative stop, not a hard kill.
    pub async fn stop(&self) {
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            let _ = worker.shutdown.send(true);
            let _ = worker.handle.await;
        }

        // Final drain: per-item failures are logged and skipped so
        // shutdown stays bounded.
        let remaining = self.queue.drain_all();
        if remaining.is_empty() {
            return;
        }

        let count = remaining.len();
        for entry in remaining {
            if let Err(e) = self.store.insert(entry).await {
                tracing::error!(error = %e, "failed to persist entry during shutdown drain");
            }
        }
        tracing::debug!(count = count, "drained queue on stop");
    }

    /// Discard everything queued and delete every stored row. Unlike
    /// `stop()`, this intentionally loses the queued entries.
    pub async fn truncate(&self) -> Result<()> {
        self.queue.drain_all();
        self.store.truncate().await
    }

    /// The decorated store, for callers that need direct access.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // Read side: straight delegation, never consults the queue.

    pub async fn paginate(
        &self,
        kind: EntryKind,
        page: PageRequest,
        include_full_data: bool,
    ) -> Result<Page> {
        self.store.paginate(kind, page, include_full_data).await
    }

    pub async fn find_by_id(&self, kind: EntryKind, id: &str) -> Result<Option<Entry>> {
        self.store.find_by_id(kind, id).await
    }

    pub async fn find_by_correlation_id(
        &self,
        correlation_id: &str,
        kind: EntryKind,
        include_full_data: bool,
    ) -> Result<Vec<Entry>> {
        self.store
            .find_by_correlation_id(correlation_id, kind, include_full_data)
            .await
    }

    pub async fn count(&self, kind: EntryKind) -> Result<u64> {
        self.store.count(kind).await
    }

    /// Requests list view: minimal projection only.
    pub async fn requests(&self, page: PageRequest) -> Result<Page> {
        self.paginate(EntryKind::Request, page, false).await
    }

    /// Queries list view: full payload (SQL text lives there).
    pub async fn queries(&self, page: PageRequest) -> Result<Page> {
        self.paginate(EntryKind::Query, page, true).await
    }

    pub async fn cache_entries(&self, page: PageRequest) -> Result<Page> {
        self.paginate(EntryKind::Cache, page, true).await
    }

    /// Exceptions list view: minimal projection only.
    pub async fn exceptions(&self, page: PageRequest) -> Result<Page> {
        self.paginate(EntryKind::Exception, page, false).await
    }
}

/// Drain one adaptively sized batch from the queue head into the store.
/// Returns how many entries were handed to `insert`.
///
/// The batch grows with backlog — `min(batch_size, max(10, depth / 10))`
/// — draining faster when behind while keeping single flushes bounded.
/// Each insert is attempted independently: one failing entry is logged
/// and dropped, never aborting the rest of the batch or the scheduler.
pub(crate) async fn flush_batch<S: Store>(
    store: &S,
    queue: &IngestQueue,
    batch_size: usize,
) -> usize {
    let depth = queue.len();
    if depth == 0 {
        return 0;
    }

    let take = batch_size.min(10.max(depth / 10));
    let batch = queue.drain_batch(take);
    let count = batch.len();

    let mut errors = 0usize;
    for entry in batch {
        if let Err(e) = store.insert(entry).await {
            tracing::error!(error = %e, "failed to persist queued entry");
            errors += 1;
        }
    }

    tracing::debug!(count = count, errors = errors, "flushed entry batch");
    count
}
