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

//! Public face of the parser runtime
//!
//! [`ParserScheduler`] owns the work queue and the worker thread. All
//! `schedule_*` calls are cheap and non-blocking; results arrive on the
//! event stream obtained from [`ParserScheduler::subscribe`].

use crate::completion::Completions;
use crate::config::ParserConfig;
use crate::error::{ParserError, ParserResult, WorkerFailure};
use crate::events::{EventBus, ParserEvent};
use crate::filer::ResultFiler;
use crate::idle::IdleHost;
use crate::priority::ParserPriority;
use crate::queue::WorkQueue;
use crate::work::{BatchId, WorkItem};
use crate::worker::{Shared, Worker};
use lexidb_core::{LexiconStore, MsaId, WordformId};
use lexiparse_compiler::GrammarCompiler;
use lexiparse_core::{AnalyzerEngine, GrammarHost};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct ParserScheduler {
    queue: Arc<WorkQueue>,
    shared: Arc<Shared>,
    filer: Arc<ResultFiler>,
    worker: Option<JoinHandle<()>>,
}

impl ParserScheduler {
    /// Build the analyzer named by `config` and start the worker thread
    pub fn start(store: Arc<LexiconStore>, config: &ParserConfig, idle: Arc<dyn IdleHost>) -> ParserResult<Self> {
        config.validate()?;

        let mut host = GrammarHost::new(Arc::clone(&store), GrammarCompiler::new(config.compiler_config()));
        if let Some(dir) = &config.data_dir {
            std::fs::create_dir_all(dir)?;
            host = host.with_data_dir(dir);
        }
        let analyzer = AnalyzerEngine::new(config.analyzer, host, config.engine_settings());

        let queue = Arc::new(WorkQueue::new());
        let completions = Arc::new(Completions::new(EventBus::new(config.event_buffer), Arc::clone(&queue)));
        let shared = Arc::new(Shared::new(Arc::clone(&completions), Arc::clone(&idle), config.lowercase_fallback));
        let filer = ResultFiler::new(store, idle, completions, config.filing.clone());

        let worker = Worker::new(analyzer, Arc::clone(&queue), Arc::clone(&filer), Arc::clone(&shared));
        let handle = thread::Builder::new()
            .name("lexiparse-worker".into())
            .spawn(move || worker.run())
            .map_err(ParserError::Spawn)?;

        info!(analyzer = %config.analyzer, "parser scheduler started");
        Ok(Self {
            queue,
            shared,
            filer,
            worker: Some(handle),
        })
    }

    fn enqueue(&self, item: WorkItem) -> ParserResult<()> {
        debug!(item = %item, "work scheduled");
        if self.queue.push(item) { Ok(()) } else { Err(ParserError::ShutDown) }
    }

    /// Recompile the grammar if the model changed since the last build
    pub fn schedule_rebuild(&self) -> ParserResult<()> {
        self.enqueue(WorkItem::Rebuild { force: false })
    }

    /// Discard the current grammar and recompile unconditionally
    pub fn schedule_reload(&self) -> ParserResult<()> {
        self.enqueue(WorkItem::Rebuild { force: true })
    }

    /// Analyze `word` and report the outcome as [`ParserEvent::TryAWordResult`]
    ///
    /// With `trace` set the event also carries a trace tree restricted to the
    /// morphemes in `morph_filter`, or covering every morpheme when it is empty.
    pub fn schedule_interactive_analyze(&self, word: impl Into<String>, trace: bool, morph_filter: BTreeSet<MsaId>) -> ParserResult<()> {
        self.enqueue(WorkItem::Interactive {
            word: word.into(),
            trace,
            morph_filter,
        })
    }

    pub fn schedule_wordform_update(&self, wordform: WordformId, priority: ParserPriority) -> ParserResult<()> {
        if !priority.is_update_level() {
            return Err(ParserError::InvalidPriority(priority));
        }
        self.enqueue(WorkItem::Update { wordform, priority, batch: None })
    }

    /// Schedule updates for many wordforms at once
    ///
    /// With `track_completion` the returned batch id is announced by exactly one
    /// [`ParserEvent::BatchComplete`] after every wordform has been filed.
    pub fn schedule_batch(&self, wordforms: &[WordformId], priority: ParserPriority, track_completion: bool) -> ParserResult<Option<BatchId>> {
        if !priority.is_update_level() {
            return Err(ParserError::InvalidPriority(priority));
        }
        if self.queue.is_shut_down() {
            return Err(ParserError::ShutDown);
        }
        let batch = track_completion.then(|| self.shared.completions.register(wordforms));
        let items = wordforms.iter().map(|&wordform| WorkItem::Update { wordform, priority, batch });
        if !self.queue.push_all(items) {
            return Err(ParserError::ShutDown);
        }
        debug!(count = wordforms.len(), %priority, "batch scheduled");
        Ok(batch)
    }

    /// Items scheduled at `priority` that have not finished
    ///
    /// A wordform update finishes once its result has been filed.
    pub fn queue_depth(&self, priority: ParserPriority) -> usize {
        self.queue.depth(priority)
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParserEvent> {
        self.shared.events.subscribe()
    }

    /// Gate interactive requests; disabled requests are consumed without a result
    pub fn set_interactive_enabled(&self, enabled: bool) {
        self.shared.interactive_enabled.store(enabled, Ordering::Release);
        self.queue.wake();
    }

    /// Rouse the worker so it reconsiders gated work
    pub fn wake(&self) {
        self.queue.wake();
    }

    pub fn interactive_enabled(&self) -> bool {
        self.shared.interactive_enabled.load(Ordering::Acquire)
    }

    /// Most recent failure caught by the worker
    pub fn last_unhandled_error(&self) -> Option<WorkerFailure> {
        self.shared.last_error.lock().clone()
    }

    pub fn filer(&self) -> &Arc<ResultFiler> {
        &self.filer
    }

    /// Stop the worker, dropping queued work and open batches
    ///
    /// The filer stops accepting results; those already queued are applied
    /// if the idle host runs while the filer is still alive.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.queue.shutdown();
        if handle.join().is_err() {
            warn!("parser worker panicked during shutdown");
        }
        self.filer.close();
        self.shared.completions.abandon();
        info!("parser scheduler stopped");
    }
}

impl Drop for ParserScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ParserScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserScheduler")
            .field("pending", &self.queue.pending())
            .field("running", &self.worker.is_some())
            .finish()
    }
}
