//! In-memory ingestion queue
//!
//! Producers push entries here from the request path; the flush task
//! drains batches from the head. The queue is unbounded — it grows
//! rather than dropping entries, and sustained producer/consumer
//! imbalance is surfaced as a warning, not an error. Push and drain are
//! each a single short critical section, so concurrent producers and the
//! flush tick cannot interleave into a corrupted state.

use crate::entry::NewEntry;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct IngestQueue {
    inner: Mutex<VecDeque<NewEntry>>,
    warn_threshold: usize,
}

impl IngestQueue {
    /// `preallocate` reserves backing storage up front (twice the warn
    /// threshold) so steady-state pushes never reallocate.
    pub fn new(warn_threshold: usize, preallocate: bool) -> Self {
        let inner = if preallocate {
            VecDeque::with_capacity(warn_threshold.saturating_mul(2))
        } else {
            VecDeque::new()
        };

        Self {
            inner: Mutex::new(inner),
            warn_threshold,
        }
    }

    /// Append an entry at the tail. Never blocks on I/O and never drops;
    /// returns the queue depth after the push.
    pub fn push(&self, entry: NewEntry) -> usize {
        let depth = {
            let mut queue = self.inner.lock().expect("ingest queue poisoned");
            queue.push_back(entry);
            queue.len()
        };

        if depth > self.warn_threshold {
            tracing::warn!(depth = depth, "telemetry queue size very large");
        }

        depth
    }

    /// Remove up to `max` entries from the head, preserving FIFO order.
    pub fn drain_batch(&self, max: usize) -> Vec<NewEntry> {
        let mut queue = self.inner.lock().expect("ingest queue poisoned");
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Atomically remove and return everything queued. Used by truncate
    /// and by the final shutdown drain.
    pub fn drain_all(&self) -> Vec<NewEntry> {
        let mut queue = self.inner.lock().expect("ingest queue poisoned");
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("ingest queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use serde_json::json;

    fn entry(n: usize) -> NewEntry {
        NewEntry::new(EntryKind::Query, json!({ "seq": n }))
    }

    #[test]
    fn push_and_drain_preserve_fifo_order() {
        let queue = IngestQueue::new(100, false);
        for n in 0..5 {
            queue.push(entry(n));
        }

        let drained = queue.drain_batch(5);
        let seqs: Vec<u64> = drained
            .iter()
            .map(|e| e.data["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn drain_batch_caps_at_available() {
        let queue = IngestQueue::new(100, false);
        queue.push(entry(0));
        queue.push(entry(1));

        assert_eq!(queue.drain_batch(10).len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_batch_leaves_remainder_in_order() {
        let queue = IngestQueue::new(100, false);
        for n in 0..10 {
            queue.push(entry(n));
        }

        let first = queue.drain_batch(4);
        assert_eq!(first.len(), 4);
        assert_eq!(queue.len(), 6);

        let rest = queue.drain_all();
        assert_eq!(rest[0].data["seq"], 4);
        assert_eq!(rest[5].data["seq"], 9);
        assert!(queue.is_empty());
    }

    #[test]
    fn push_reports_depth() {
        let queue = IngestQueue::new(2, true);
        assert_eq!(queue.push(entry(0)), 1);
        assert_eq!(queue.push(entry(1)), 2);
        assert_eq!(queue.push(entry(2)), 3);
    }
}
