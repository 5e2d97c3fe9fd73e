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

//! Parser event stream

use crate::error::WorkerFailure;
use crate::priority::ParserPriority;
use crate::work::BatchId;
use lexidb_core::WordformId;
use lexiparse_core::{AnalysisResult, TraceTree};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// How a filed result was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilingOutcome {
    /// Analyses were written
    Applied,
    /// Result identical to the last one filed
    Unchanged,
    /// Wordform or a referenced object no longer exists
    Stale,
    /// The work item was dropped before analysis
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Working { description: String, depth: usize },
    Idle,
}

#[derive(Debug, Clone)]
pub enum ParserEvent {
    WordformUpdated {
        wordform: WordformId,
        priority: ParserPriority,
        outcome: FilingOutcome,
    },
    TryAWordResult {
        word: String,
        result: AnalysisResult,
        trace: Option<TraceTree>,
    },
    TaskStatus(TaskStatus),
    BatchComplete(BatchId),
    GrammarRebuilt {
        version: u64,
        errors: usize,
    },
    UnhandledWorkerError(WorkerFailure),
}

/// Broadcast channel fanning events out to every subscriber
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ParserEvent>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParserEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send to current subscribers; events with no subscriber are dropped
    pub fn emit(&self, event: ParserEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(?event, "event dropped without subscribers");
        }
    }
}
