// Lexiparse
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Completion events and batch tracking
//!
//! A wordform update counts as queued work until its completion is reported
//! here, which for filed results is after the apply pass has committed.

use crate::events::{EventBus, FilingOutcome, ParserEvent, TaskStatus};
use crate::priority::ParserPriority;
use crate::queue::WorkQueue;
use crate::work::BatchId;
use lexidb_core::WordformId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Fires per-wordform completion events and the batch-complete signal
#[derive(Debug)]
pub struct Completions {
    events: EventBus,
    queue: Arc<WorkQueue>,
    /// Outstanding items per tracked batch
    batches: Mutex<HashMap<BatchId, HashMap<WordformId, usize>>>,
    next_batch: AtomicU64,
}

impl Completions {
    pub fn new(events: EventBus, queue: Arc<WorkQueue>) -> Self {
        Self {
            events,
            queue,
            batches: Mutex::new(HashMap::new()),
            next_batch: AtomicU64::new(1),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start tracking a batch; an empty batch completes immediately
    pub fn register(&self, wordforms: &[WordformId]) -> BatchId {
        let id = BatchId(self.next_batch.fetch_add(1, Ordering::Relaxed));
        let mut outstanding: HashMap<WordformId, usize> = HashMap::new();
        for wordform in wordforms {
            *outstanding.entry(*wordform).or_default() += 1;
        }
        if outstanding.is_empty() {
            self.events.emit(ParserEvent::BatchComplete(id));
        } else {
            debug!(batch = %id, items = wordforms.len(), "batch registered");
            self.batches.lock().insert(id, outstanding);
        }
        id
    }

    /// Report that work on `wordform` is finished, however it ended
    ///
    /// Lowers the queue counter for `priority` and announces idle when this
    /// was the last unfinished item.
    pub fn finish(&self, wordform: WordformId, priority: ParserPriority, outcome: FilingOutcome, batch: Option<BatchId>) {
        self.events.emit(ParserEvent::WordformUpdated { wordform, priority, outcome });
        if let Some(batch) = batch {
            if self.settle(batch, wordform) {
                info!(batch = %batch, "batch complete");
                self.events.emit(ParserEvent::BatchComplete(batch));
            }
        }
        if self.queue.complete(priority) {
            debug!("parser queue idle");
            self.events.emit(ParserEvent::TaskStatus(TaskStatus::Idle));
        }
    }

    /// Remove one member from `batch`; true when it was the last one
    fn settle(&self, batch: BatchId, wordform: WordformId) -> bool {
        let mut batches = self.batches.lock();
        let Some(outstanding) = batches.get_mut(&batch) else {
            return false;
        };
        if let Some(count) = outstanding.get_mut(&wordform) {
            *count -= 1;
            if *count == 0 {
                outstanding.remove(&wordform);
            }
        }
        let done = outstanding.is_empty();
        if done {
            batches.remove(&batch);
        }
        done
    }

    /// Forget every open batch; none of them will complete
    pub fn abandon(&self) -> usize {
        let dropped = self.batches.lock().drain().count();
        if dropped > 0 {
            debug!(dropped, "open batches abandoned");
        }
        dropped
    }

    pub fn open_batches(&self) -> usize {
        self.batches.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkItem;
    use lexidb_core::ObjectId;

    fn wf(n: u64) -> WordformId {
        WordformId(ObjectId(n))
    }

    fn completions() -> (Arc<WorkQueue>, Completions) {
        let queue = Arc::new(WorkQueue::new());
        (Arc::clone(&queue), Completions::new(EventBus::new(64), queue))
    }

    fn batch_signals(rx: &mut tokio::sync::broadcast::Receiver<ParserEvent>) -> Vec<BatchId> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                ParserEvent::BatchComplete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_batch_completes_once_in_any_order() {
        let (_queue, completions) = completions();
        let mut rx = completions.events().subscribe();
        let batch = completions.register(&[wf(1), wf(2), wf(3)]);

        completions.finish(wf(3), ParserPriority::Low, FilingOutcome::Applied, Some(batch));
        completions.finish(wf(1), ParserPriority::Low, FilingOutcome::Stale, Some(batch));
        assert!(batch_signals(&mut rx).is_empty());

        completions.finish(wf(2), ParserPriority::Low, FilingOutcome::Unchanged, Some(batch));
        assert_eq!(batch_signals(&mut rx), vec![batch]);

        completions.finish(wf(2), ParserPriority::Low, FilingOutcome::Unchanged, Some(batch));
        assert!(batch_signals(&mut rx).is_empty());
        assert_eq!(completions.open_batches(), 0);
    }

    #[test]
    fn test_duplicate_members_are_counted() {
        let (_queue, completions) = completions();
        let mut rx = completions.events().subscribe();
        let batch = completions.register(&[wf(1), wf(1)]);
        completions.finish(wf(1), ParserPriority::High, FilingOutcome::Applied, Some(batch));
        assert!(batch_signals(&mut rx).is_empty());
        completions.finish(wf(1), ParserPriority::High, FilingOutcome::Applied, Some(batch));
        assert_eq!(batch_signals(&mut rx), vec![batch]);
    }

    #[test]
    fn test_finish_lowers_the_queue_and_announces_idle() {
        let (queue, completions) = completions();
        let mut rx = completions.events().subscribe();
        queue.push(WorkItem::Update {
            wordform: wf(7),
            priority: ParserPriority::Medium,
            batch: None,
        });
        assert!(queue.try_next().is_some());
        assert_eq!(queue.depth(ParserPriority::Medium), 1, "dequeued but not finished");

        completions.finish(wf(7), ParserPriority::Medium, FilingOutcome::Applied, None);
        assert_eq!(queue.depth(ParserPriority::Medium), 0);
        let events: Vec<ParserEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(matches!(events[0], ParserEvent::WordformUpdated { .. }));
        assert!(matches!(events[1], ParserEvent::TaskStatus(TaskStatus::Idle)));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_abandoned_batches_never_complete() {
        let (_queue, completions) = completions();
        let mut rx = completions.events().subscribe();
        let batch = completions.register(&[wf(1), wf(2)]);
        assert_eq!(completions.abandon(), 1);
        completions.finish(wf(1), ParserPriority::Low, FilingOutcome::Skipped, Some(batch));
        completions.finish(wf(2), ParserPriority::Low, FilingOutcome::Skipped, Some(batch));
        assert!(batch_signals(&mut rx).is_empty());
        assert_eq!(completions.open_batches(), 0);
    }
}
