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

//! Filing analysis results into the store
//!
//! [`ResultFiler::file`] only queues a result. The queue is applied in one
//! exclusive store transaction when the host is idle, so filing never races
//! other store mutations and never holds the store while a word is analyzed.
//! Completion events fire after the transaction has committed.

use crate::completion::Completions;
use crate::config::FilingPolicy;
use crate::events::FilingOutcome;
use crate::idle::IdleHost;
use crate::priority::ParserPriority;
use crate::work::BatchId;
use lexidb_core::{Agent, AnalysisId, LexiconStore, Opinion, ProblemMarker, StoredAnalysis, StoredSegment, Transaction, Wordform, WordformId};
use lexiparse_core::{AnalysisResult, MorphSegment};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct FilingRequest {
    wordform: WordformId,
    priority: ParserPriority,
    result: AnalysisResult,
    batch: Option<BatchId>,
}

pub struct ResultFiler {
    store: Arc<LexiconStore>,
    idle: Arc<dyn IdleHost>,
    completions: Arc<Completions>,
    policy: FilingPolicy,
    pending: Mutex<VecDeque<FilingRequest>>,
    /// An apply pass has been requested from the idle host and not yet run
    idle_requested: AtomicBool,
    closed: AtomicBool,
    me: Weak<ResultFiler>,
}

impl ResultFiler {
    pub fn new(store: Arc<LexiconStore>, idle: Arc<dyn IdleHost>, completions: Arc<Completions>, policy: FilingPolicy) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            store,
            idle,
            completions,
            policy,
            pending: Mutex::new(VecDeque::new()),
            idle_requested: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    /// Queue `result` for `wordform`; false when the filer no longer accepts work
    pub fn file(&self, wordform: WordformId, priority: ParserPriority, result: AnalysisResult, batch: Option<BatchId>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.pending.lock().push_back(FilingRequest {
            wordform,
            priority,
            result,
            batch,
        });
        if !self.idle_requested.swap(true, Ordering::AcqRel) {
            let filer = self.me.clone();
            self.idle.run_on_idle(Box::new(move || {
                if let Some(filer) = filer.upgrade() {
                    filer.apply_pending();
                }
            }));
        }
        true
    }

    /// Results waiting for the next apply pass
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Stop accepting results; queued ones are still applied
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Apply every queued result in one store transaction
    pub fn apply_pending(&self) -> usize {
        self.idle_requested.store(false, Ordering::Release);
        let requests: Vec<FilingRequest> = self.pending.lock().drain(..).collect();
        if requests.is_empty() {
            return 0;
        }

        let outcomes: Vec<FilingOutcome> = self
            .store
            .run_exclusive(|txn| requests.iter().map(|request| apply(txn, request, &self.policy)).collect());

        for (request, outcome) in requests.iter().zip(outcomes) {
            debug!(wordform = %request.wordform, priority = %request.priority, ?outcome, "result filed");
            self.completions.finish(request.wordform, request.priority, outcome, request.batch);
        }
        info!(count = requests.len(), "apply pass finished");
        requests.len()
    }
}

impl std::fmt::Debug for ResultFiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultFiler")
            .field("pending", &self.pending())
            .field("policy", &self.policy)
            .finish()
    }
}

fn stored(segment: &MorphSegment) -> StoredSegment {
    StoredSegment {
        form: segment.form,
        msa: segment.msa,
        infl_type: segment.infl_type,
    }
}

fn segment_valid(txn: &Transaction<'_>, segment: &StoredSegment) -> bool {
    txn.is_valid(segment.form) && txn.is_valid(segment.msa) && segment.infl_type.is_none_or(|t| txn.is_valid(t))
}

fn apply(txn: &mut Transaction<'_>, request: &FilingRequest, policy: &FilingPolicy) -> FilingOutcome {
    let wordform = request.wordform;
    let Some(record) = txn.get::<Wordform>(wordform) else {
        return FilingOutcome::Stale;
    };
    let previous = record.checksum;
    let existing = record.analyses.clone();

    let candidates: Vec<Vec<StoredSegment>> = request.result.candidates.iter().map(|c| c.segments.iter().map(stored).collect()).collect();
    if candidates.iter().flatten().any(|segment| !segment_valid(txn, segment)) {
        return FilingOutcome::Stale;
    }

    let checksum = request.result.checksum();
    if previous == Some(checksum) {
        return FilingOutcome::Unchanged;
    }

    let machine_problems: Vec<_> = txn.corpus().problems_for(wordform).filter(|p| p.owner == Agent::Machine).map(|p| p.id).collect();
    for problem in machine_problems {
        txn.remove::<ProblemMarker>(problem);
    }
    for analysis in &existing {
        txn.update::<StoredAnalysis>(*analysis, |a| a.set_opinion(Agent::Machine, Opinion::Neutral));
    }

    let mut matched: Vec<AnalysisId> = Vec::new();
    let mut created: Vec<AnalysisId> = Vec::new();
    if let Some(message) = &request.result.error {
        txn.insert(|id| ProblemMarker {
            id,
            target: wordform,
            owner: Agent::Machine,
            message: message.clone(),
        });
    } else {
        for segments in &candidates {
            let matches: Vec<AnalysisId> = existing
                .iter()
                .copied()
                .filter(|id| txn.get::<StoredAnalysis>(*id).is_some_and(|a| a.segments == *segments))
                .collect();
            if matches.is_empty() {
                let id = txn.insert(|id| StoredAnalysis {
                    id,
                    wordform,
                    segments: segments.clone(),
                    machine_opinion: Opinion::Approves,
                    human_opinion: Opinion::Neutral,
                });
                created.push(id);
            } else {
                for id in &matches {
                    txn.update::<StoredAnalysis>(*id, |a| a.set_opinion(Agent::Machine, Opinion::Approves));
                }
                matched.extend(matches);
            }
        }
    }

    let mut removed: Vec<AnalysisId> = Vec::new();
    for id in existing.iter().copied().filter(|id| !matched.contains(id)) {
        let Some(analysis) = txn.get::<StoredAnalysis>(id) else {
            removed.push(id);
            continue;
        };
        let in_use = txn.corpus().is_in_use(id);
        let human = analysis.human_opinion;
        let broken = !analysis.segments.iter().all(|s| segment_valid(txn, s));
        if human == Opinion::Approves && in_use {
            txn.update::<StoredAnalysis>(id, |a| a.set_opinion(Agent::Machine, Opinion::Disapproves));
        } else if (policy.purge_invalid && broken) || (policy.delete_unused_neutral && human == Opinion::Neutral && !in_use) {
            txn.remove::<StoredAnalysis>(id);
            removed.push(id);
        }
    }

    txn.update::<Wordform>(wordform, |w| {
        w.analyses.retain(|id| !removed.contains(id));
        w.analyses.extend(created.iter().copied());
        w.checksum = Some(checksum);
    });
    FilingOutcome::Applied
}
