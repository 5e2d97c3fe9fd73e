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

//! Priority work queue
//!
//! Items are ordered by (priority, sequence number): strict priority across
//! levels and FIFO within a level. A per-level counter is raised on enqueue
//! and lowered only when the worker reports the item completed or skipped,
//! so it counts work not yet finished rather than work not yet dequeued.

use crate::priority::ParserPriority;
use crate::work::WorkItem;
use metrics::{counter, gauge};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

#[derive(Debug)]
struct Queued {
    priority: ParserPriority,
    seq: u64,
    item: WorkItem,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap pops the greatest element: the most urgent level, then the oldest item
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.cmp(&self.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// What the worker should do next
#[derive(Debug)]
pub enum Next {
    Item(WorkItem),
    /// Woken without new work
    Woken,
    Shutdown,
}

#[derive(Debug)]
struct QueueState {
    heap: BinaryHeap<Queued>,
    counters: [usize; 5],
    next_seq: u64,
    shutdown: bool,
    woken: bool,
    /// The current idle period has been announced
    idle_notified: bool,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        ParserPriority::ALL.iter().filter(|p| p.counts_toward_idle()).all(|p| self.counters[p.index()] == 0)
    }
}

#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                counters: [0; 5],
                next_seq: 0,
                shutdown: false,
                woken: false,
                idle_notified: true,
            }),
            ready: Condvar::new(),
        }
    }

    /// Enqueue one item; returns false once the queue is shut down
    pub fn push(&self, item: WorkItem) -> bool {
        self.push_all(std::iter::once(item))
    }

    /// Enqueue several items atomically with respect to the worker
    pub fn push_all(&self, items: impl IntoIterator<Item = WorkItem>) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }
        let mut touched = [false; 5];
        for item in items {
            let priority = item.priority();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.counters[priority.index()] += 1;
            if priority.counts_toward_idle() {
                state.idle_notified = false;
            }
            touched[priority.index()] = true;
            debug!(%priority, seq, item = %item, "work enqueued");
            state.heap.push(Queued { priority, seq, item });
        }
        for priority in ParserPriority::ALL.into_iter().filter(|p| touched[p.index()]) {
            gauge!("lexiparse_queue_depth", state.counters[priority.index()] as f64, "priority" => priority.as_str());
        }
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Block until there is work, a wake-up or shutdown
    pub fn next(&self) -> Next {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return Next::Shutdown;
            }
            if let Some(queued) = state.heap.pop() {
                return Next::Item(queued.item);
            }
            if std::mem::take(&mut state.woken) {
                return Next::Woken;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Dequeue without blocking
    pub fn try_next(&self) -> Option<WorkItem> {
        self.state.lock().heap.pop().map(|queued| queued.item)
    }

    /// Record that an item of `priority` finished or was skipped
    ///
    /// Returns true when this completion moves the queue into idle for the
    /// first time since it was last busy.
    pub fn complete(&self, priority: ParserPriority) -> bool {
        let mut state = self.state.lock();
        let counter = &mut state.counters[priority.index()];
        *counter = counter.saturating_sub(1);
        let depth = *counter;
        gauge!("lexiparse_queue_depth", depth as f64, "priority" => priority.as_str());
        counter!("lexiparse_work_completed", 1, "priority" => priority.as_str());
        state.take_idle_transition()
    }

    /// Announce idle if it has not been announced yet
    pub fn take_idle(&self) -> bool {
        self.state.lock().take_idle_transition()
    }

    pub fn depth(&self, priority: ParserPriority) -> usize {
        self.state.lock().counters[priority.index()]
    }

    /// Unfinished items across all levels
    pub fn pending(&self) -> usize {
        self.state.lock().counters.iter().sum()
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().is_idle()
    }

    pub fn wake(&self) {
        self.state.lock().woken = true;
        self.ready.notify_all();
    }

    /// Refuse new work and drop what is queued; every counter returns to zero
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        let dropped = state.heap.len();
        state.heap.clear();
        state.counters = [0; 5];
        state.idle_notified = true;
        for priority in ParserPriority::ALL {
            gauge!("lexiparse_queue_depth", 0.0, "priority" => priority.as_str());
        }
        drop(state);
        debug!(dropped, "work queue shut down");
        self.ready.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }
}

impl QueueState {
    fn take_idle_transition(&mut self) -> bool {
        if self.is_idle() && !self.idle_notified {
            self.idle_notified = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexidb_core::{ObjectId, WordformId};
    use proptest::prelude::*;

    fn update(n: u64, priority: ParserPriority) -> WorkItem {
        WorkItem::Update {
            wordform: WordformId(ObjectId(n)),
            priority,
            batch: None,
        }
    }

    #[test]
    fn test_strict_priority_then_fifo() {
        let queue = WorkQueue::new();
        queue.push(update(1, ParserPriority::Low));
        queue.push(update(2, ParserPriority::High));
        queue.push(WorkItem::Rebuild { force: false });
        queue.push(update(3, ParserPriority::Medium));
        queue.push(update(4, ParserPriority::High));

        let order: Vec<ParserPriority> = std::iter::from_fn(|| queue.try_next()).map(|item| item.priority()).collect();
        assert_eq!(
            order,
            vec![ParserPriority::RebuildGrammar, ParserPriority::High, ParserPriority::High, ParserPriority::Medium, ParserPriority::Low]
        );
    }

    #[test]
    fn test_fifo_within_level() {
        let queue = WorkQueue::new();
        for n in 1..=3 {
            queue.push(update(n, ParserPriority::Medium));
        }
        let ids: Vec<WorkItem> = std::iter::from_fn(|| queue.try_next()).collect();
        assert_eq!(ids, vec![update(1, ParserPriority::Medium), update(2, ParserPriority::Medium), update(3, ParserPriority::Medium)]);
    }

    #[test]
    fn test_idle_is_announced_once_per_transition() {
        let queue = WorkQueue::new();
        assert!(queue.is_idle());
        assert!(!queue.take_idle(), "nothing to announce before any work");

        queue.push(WorkItem::Rebuild { force: false });
        queue.push(update(1, ParserPriority::Low));
        queue.push(update(2, ParserPriority::Low));
        assert!(!queue.is_idle());

        assert!(!queue.complete(ParserPriority::RebuildGrammar));
        assert!(!queue.complete(ParserPriority::Low));
        assert!(queue.complete(ParserPriority::Low));
        assert!(!queue.take_idle());

        queue.push(WorkItem::Rebuild { force: true });
        assert!(queue.is_idle(), "a pending rebuild does not count as work");
        assert!(!queue.complete(ParserPriority::RebuildGrammar));
    }

    #[test]
    fn test_wake_and_shutdown_unblock_the_worker() {
        let queue = WorkQueue::new();
        queue.wake();
        assert!(matches!(queue.next(), Next::Woken));
        queue.push(update(1, ParserPriority::High));
        queue.shutdown();
        assert!(matches!(queue.next(), Next::Shutdown));
        assert!(!queue.push(update(2, ParserPriority::High)));
    }

    #[test]
    fn test_shutdown_clears_counters() {
        let queue = WorkQueue::new();
        queue.push(update(1, ParserPriority::Low));
        queue.push(update(2, ParserPriority::Medium));
        queue.push(WorkItem::Rebuild { force: true });
        assert!(queue.try_next().is_some(), "one item in flight");
        assert_eq!(queue.pending(), 3);

        queue.shutdown();
        assert_eq!(queue.pending(), 0);
        for level in ParserPriority::ALL {
            assert_eq!(queue.depth(level), 0);
        }
        assert!(queue.is_idle());
        assert!(!queue.complete(ParserPriority::Medium), "late completions stay at zero");
        assert_eq!(queue.depth(ParserPriority::Medium), 0);
    }

    fn item_for(priority: ParserPriority, n: u64) -> WorkItem {
        match priority {
            ParserPriority::RebuildGrammar => WorkItem::Rebuild { force: false },
            ParserPriority::Interactive => WorkItem::Interactive {
                word: format!("w{n}"),
                trace: false,
                morph_filter: Default::default(),
            },
            level => update(n, level),
        }
    }

    proptest! {
        #[test]
        fn prop_counters_return_to_zero(
            priorities in prop::collection::vec(prop::sample::select(ParserPriority::ALL.to_vec()), 0..64),
            interleave in prop::collection::vec(any::<bool>(), 0..128),
        ) {
            let queue = WorkQueue::new();
            let mut remaining = priorities.iter().copied().enumerate();
            let mut decisions = interleave.into_iter();
            let mut finished = 0;
            loop {
                // Either enqueue the next item or let the worker finish one
                if decisions.next().unwrap_or(false) {
                    if let Some((n, p)) = remaining.next() {
                        queue.push(item_for(p, n as u64));
                        continue;
                    }
                }
                match queue.try_next() {
                    Some(item) => {
                        queue.complete(item.priority());
                        finished += 1;
                    }
                    None => match remaining.next() {
                        Some((n, p)) => {
                            queue.push(item_for(p, n as u64));
                            prop_assert!(queue.depth(p) > 0);
                        }
                        None => break,
                    },
                }
            }
            prop_assert_eq!(finished, priorities.len());
            for level in ParserPriority::ALL {
                prop_assert_eq!(queue.depth(level), 0);
            }
            prop_assert!(queue.is_idle());
        }
    }
}
