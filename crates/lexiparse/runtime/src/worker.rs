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

//! The single parser worker
//!
//! Exactly one worker thread executes dequeued work. Producers only enqueue;
//! the analyzer and its grammar are owned by the worker and never shared.

use crate::completion::Completions;
use crate::error::WorkerFailure;
use crate::events::{EventBus, FilingOutcome, ParserEvent, TaskStatus};
use crate::filer::ResultFiler;
use crate::idle::IdleHost;
use crate::queue::{Next, WorkQueue};
use crate::work::WorkItem;
use lexidb_core::Wordform;
use lexiparse_compiler::TracingSink;
use lexiparse_core::{AnalysisResult, Analyzer, AnalyzerEngine, NormalizedWord, TraceSelector};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// State shared between the scheduler handle and the worker
pub(crate) struct Shared {
    pub events: EventBus,
    pub completions: Arc<Completions>,
    pub idle: Arc<dyn IdleHost>,
    pub interactive_enabled: AtomicBool,
    pub last_error: Mutex<Option<WorkerFailure>>,
    pub lowercase_fallback: bool,
}

impl Shared {
    pub fn new(completions: Arc<Completions>, idle: Arc<dyn IdleHost>, lowercase_fallback: bool) -> Self {
        Self {
            events: completions.events().clone(),
            completions,
            idle,
            interactive_enabled: AtomicBool::new(true),
            last_error: Mutex::new(None),
            lowercase_fallback,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `body`, converting a panic into a [`WorkerFailure`]
fn guarded(description: &str, body: impl FnOnce()) -> Result<(), WorkerFailure> {
    panic::catch_unwind(AssertUnwindSafe(body)).map_err(|payload| WorkerFailure {
        item: description.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

pub(crate) struct Worker {
    analyzer: AnalyzerEngine,
    queue: Arc<WorkQueue>,
    filer: Arc<ResultFiler>,
    shared: Arc<Shared>,
    /// The current update's result is queued with the filer, which will finish it
    handed_off: bool,
    #[cfg(test)]
    fail_on: Option<lexidb_core::WordformId>,
}

impl Worker {
    pub fn new(analyzer: AnalyzerEngine, queue: Arc<WorkQueue>, filer: Arc<ResultFiler>, shared: Arc<Shared>) -> Self {
        Self {
            analyzer,
            queue,
            filer,
            shared,
            handed_off: false,
            #[cfg(test)]
            fail_on: None,
        }
    }

    pub fn run(mut self) {
        info!(analyzer = %self.analyzer.kind(), "parser worker started");
        loop {
            match self.queue.next() {
                Next::Item(item) => self.process(item),
                Next::Woken => {
                    debug!("parser worker woken");
                    if self.queue.take_idle() {
                        self.announce_idle();
                    }
                }
                Next::Shutdown => break,
            }
        }
        info!("parser worker stopped");
    }

    /// Execute one dequeued item and settle its bookkeeping
    ///
    /// Updates are counted as finished by [`Completions::finish`], after
    /// filing when a result was produced; other items are finished here.
    pub fn process(&mut self, item: WorkItem) {
        let priority = item.priority();
        let description = item.to_string();
        let depth = self.queue.pending();
        self.shared.idle.report_task(&description, depth);
        self.shared.events.emit(ParserEvent::TaskStatus(TaskStatus::Working {
            description: description.clone(),
            depth,
        }));

        let target = match &item {
            WorkItem::Update { wordform, priority, batch } => Some((*wordform, *priority, *batch)),
            _ => None,
        };
        self.handed_off = false;
        if let Err(failure) = guarded(&description, || self.handle(item)) {
            error!(item = %failure.item, message = %failure.message, "unhandled worker error");
            *self.shared.last_error.lock() = Some(failure.clone());
            self.shared.events.emit(ParserEvent::UnhandledWorkerError(failure));
            if let Some((wordform, priority, batch)) = target.filter(|_| !self.handed_off) {
                self.shared.completions.finish(wordform, priority, FilingOutcome::Skipped, batch);
            }
        }

        if target.is_none() && self.queue.complete(priority) {
            self.announce_idle();
        }
    }

    fn announce_idle(&self) {
        debug!("parser queue idle");
        self.shared.idle.report_task("idle", 0);
        self.shared.events.emit(ParserEvent::TaskStatus(TaskStatus::Idle));
    }

    fn handle(&mut self, item: WorkItem) {
        match item {
            WorkItem::Rebuild { force } => {
                if force {
                    self.analyzer.reset();
                }
                if self.analyzer.is_up_to_date() {
                    debug!("grammar up to date; rebuild skipped");
                } else {
                    self.rebuild();
                }
            }
            WorkItem::Interactive { word, trace, morph_filter } => {
                if !self.shared.interactive_enabled.load(Ordering::Acquire) {
                    debug!(word = %word, "interactive analysis disabled; request skipped");
                    return;
                }
                if !self.analyzer.is_up_to_date() {
                    self.rebuild();
                }
                let normalized = NormalizedWord::new(&word);
                let (result, trace) = if trace {
                    let (result, tree) = self.analyzer.analyze_with_trace(&normalized, &TraceSelector::only(morph_filter));
                    (result, Some(tree))
                } else {
                    (self.analyzer.analyze(&normalized), None)
                };
                self.shared.events.emit(ParserEvent::TryAWordResult { word, result, trace });
            }
            WorkItem::Update { wordform, priority, batch } => {
                let form = self.analyzer.host().store().read(|view| view.get::<Wordform>(wordform).map(|w| w.form.clone()));
                let Some(form) = form else {
                    debug!(%wordform, "wordform no longer exists; update skipped");
                    self.shared.completions.finish(wordform, priority, FilingOutcome::Skipped, batch);
                    return;
                };
                // Queued updates keep the installed grammar even when it has gone stale
                if self.analyzer.grammar().is_none() {
                    self.rebuild();
                }
                #[cfg(test)]
                if self.fail_on == Some(wordform) {
                    panic!("injected failure for {wordform}");
                }
                let result = self.analyze_wordform(&form);
                if self.filer.file(wordform, priority, result, batch) {
                    self.handed_off = true;
                } else {
                    self.shared.completions.finish(wordform, priority, FilingOutcome::Skipped, batch);
                }
            }
        }
    }

    fn rebuild(&mut self) {
        let mut sink = TracingSink::default();
        if let Err(err) = self.analyzer.rebuild(&mut sink) {
            warn!(error = %err, "grammar installed but diagnostics were not written");
        }
        let version = self.analyzer.grammar().map(|g| g.model_version).unwrap_or_default();
        self.shared.events.emit(ParserEvent::GrammarRebuilt {
            version,
            errors: sink.reported,
        });
    }

    fn analyze_wordform(&self, form: &str) -> AnalysisResult {
        let word = NormalizedWord::new(form);
        let result = self.analyzer.analyze(&word);
        if self.shared.lowercase_fallback && result.candidates.is_empty() && !result.is_error() && word.has_uppercase() {
            let lowered = self.analyzer.analyze(&word.to_lowercase());
            if !lowered.candidates.is_empty() {
                debug!(form, "analyzed in lowercase");
                return lowered;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilingPolicy;
    use crate::idle::ManualIdleHost;
    use crate::priority::ParserPriority;
    use lexidb_core::{ImportedModel, LexiconStore, ModelDocument, MprGroup};
    use lexiparse_compiler::GrammarCompiler;
    use lexiparse_core::{AnalyzerKind, EngineSettings, GrammarHost};
    use tokio::sync::broadcast;

    const WORDS: [&str; 10] = ["cat", "cats", "dog", "dogs", "Cats", "bus", "buss", "cast", "tac", "scat"];

    fn fixture() -> (Arc<LexiconStore>, ImportedModel) {
        let store = Arc::new(LexiconStore::new());
        let document = serde_json::json!({
            "phonemes": "abcdgiostu".chars().map(|c| serde_json::json!({ "name": c.to_string() })).collect::<Vec<_>>(),
            "parts_of_speech": [{ "abbr": "n", "slots": [{ "name": "NUM", "optional": true }], "templates": [{ "name": "noun", "suffix_slots": ["NUM"] }] }],
            "entries": [
                { "key": "cat", "forms": [{ "form": "cat", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
                { "key": "bus", "forms": [{ "form": "bus", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
                { "key": "PL", "forms": [{ "form": "-s", "type": "suffix" }], "msas": [{ "kind": "infl", "pos": "n", "slots": ["NUM"] }] }
            ],
            "wordforms": WORDS
        });
        let model = ModelDocument::from_value(document).expect("document").import(&store).expect("import");
        (store, model)
    }

    struct Harness {
        worker: Worker,
        queue: Arc<WorkQueue>,
        filer: Arc<ResultFiler>,
        shared: Arc<Shared>,
        idle: Arc<ManualIdleHost>,
        events: broadcast::Receiver<ParserEvent>,
    }

    fn harness(store: Arc<LexiconStore>) -> Harness {
        let idle = Arc::new(ManualIdleHost::new());
        let queue = Arc::new(WorkQueue::new());
        let completions = Arc::new(Completions::new(EventBus::new(512), Arc::clone(&queue)));
        let events = completions.events().subscribe();
        let shared = Arc::new(Shared::new(Arc::clone(&completions), idle.clone(), true));
        let filer = ResultFiler::new(Arc::clone(&store), idle.clone(), completions, FilingPolicy::default());
        let analyzer = AnalyzerEngine::new(AnalyzerKind::Unification, GrammarHost::new(store, GrammarCompiler::default()), EngineSettings::default());
        Harness {
            worker: Worker::new(analyzer, Arc::clone(&queue), Arc::clone(&filer), Arc::clone(&shared)),
            queue,
            filer,
            shared,
            idle,
            events,
        }
    }

    impl Harness {
        fn drain(&mut self) {
            while let Some(item) = self.queue.try_next() {
                self.worker.process(item);
            }
        }

        fn received(&mut self) -> Vec<ParserEvent> {
            std::iter::from_fn(|| self.events.try_recv().ok()).collect()
        }
    }

    fn update(model: &ImportedModel, word: &str, priority: ParserPriority) -> WorkItem {
        WorkItem::Update {
            wordform: model.wordform(word).expect("wordform"),
            priority,
            batch: None,
        }
    }

    #[test]
    fn test_executes_in_priority_order() {
        let (store, model) = fixture();
        let mut h = harness(store);
        h.queue.push(update(&model, "cat", ParserPriority::Low));
        h.queue.push(update(&model, "dog", ParserPriority::High));
        h.queue.push(WorkItem::Rebuild { force: false });
        h.queue.push(update(&model, "bus", ParserPriority::Medium));
        h.drain();

        let started: Vec<String> = h
            .received()
            .into_iter()
            .filter_map(|event| match event {
                ParserEvent::TaskStatus(TaskStatus::Working { description, .. }) => Some(description),
                _ => None,
            })
            .collect();
        assert_eq!(started.len(), 4);
        assert_eq!(started[0], "rebuild grammar");
        assert!(started[1].ends_with("(high)"), "{started:?}");
        assert!(started[2].ends_with("(medium)"), "{started:?}");
        assert!(started[3].ends_with("(low)"), "{started:?}");
    }

    #[test]
    fn test_updates_stay_counted_until_filed() {
        let (store, model) = fixture();
        let mut h = harness(store);
        h.queue.push(update(&model, "cats", ParserPriority::Medium));
        h.queue.push(WorkItem::Rebuild { force: false });
        h.drain();

        assert_eq!(h.filer.pending(), 1);
        assert_eq!(h.queue.depth(ParserPriority::Medium), 1);
        assert_eq!(h.queue.depth(ParserPriority::RebuildGrammar), 0);
        assert!(!h.queue.is_idle());
        assert!(!h.received().iter().any(|e| matches!(e, ParserEvent::TaskStatus(TaskStatus::Idle))));

        assert_eq!(h.idle.run_pending(), 1);
        assert_eq!(h.queue.depth(ParserPriority::Medium), 0);
        let settled: Vec<ParserEvent> = h
            .received()
            .into_iter()
            .filter(|e| matches!(e, ParserEvent::WordformUpdated { .. } | ParserEvent::TaskStatus(TaskStatus::Idle)))
            .collect();
        assert!(matches!(settled[0], ParserEvent::WordformUpdated { outcome: FilingOutcome::Applied, .. }));
        assert!(matches!(settled[1], ParserEvent::TaskStatus(TaskStatus::Idle)));
        assert_eq!(settled.len(), 2);
    }

    #[test]
    fn test_failing_item_is_reported_and_the_loop_continues() {
        let (store, model) = fixture();
        let mut h = harness(store);
        let words = ["cat", "cats", "bus"];
        let wordforms: Vec<_> = words.iter().map(|w| model.wordform(w).expect("wordform")).collect();
        h.worker.fail_on = Some(wordforms[1]);

        let batch = h.shared.completions.register(&wordforms);
        h.queue.push_all(wordforms.iter().map(|&wordform| WorkItem::Update {
            wordform,
            priority: ParserPriority::Low,
            batch: Some(batch),
        }));

        let Harness { worker, queue, filer, shared, idle, mut events } = h;
        let running = std::thread::spawn(move || worker.run());
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while filer.pending() < 2 {
            assert!(std::time::Instant::now() < deadline, "worker stalled after the failure");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(idle.run_pending(), 1);
        queue.shutdown();
        running.join().expect("worker thread");

        let failure = shared.last_error.lock().clone().expect("failure recorded");
        assert!(failure.message.contains("injected failure"), "{failure}");
        assert!(failure.item.ends_with("(low)"));

        let events: Vec<ParserEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(events.iter().filter(|e| matches!(e, ParserEvent::UnhandledWorkerError(_))).count(), 1);
        let outcomes: Vec<FilingOutcome> = events
            .iter()
            .filter_map(|e| match e {
                ParserEvent::WordformUpdated { outcome, .. } => Some(*outcome),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|o| **o == FilingOutcome::Skipped).count(), 1);
        let last_update = events.iter().rposition(|e| matches!(e, ParserEvent::WordformUpdated { .. })).expect("updates");
        let complete = events.iter().position(|e| matches!(e, ParserEvent::BatchComplete(id) if *id == batch)).expect("batch complete");
        assert_eq!(events.iter().filter(|e| matches!(e, ParserEvent::BatchComplete(_))).count(), 1);
        assert!(complete > last_update);
    }

    #[test]
    fn test_queued_updates_keep_the_old_grammar() {
        let (store, model) = fixture();
        let mut h = harness(Arc::clone(&store));
        h.queue.push_all(WORDS.iter().map(|w| update(&model, w, ParserPriority::Low)));

        for _ in 0..3 {
            let item = h.queue.try_next().expect("queued update");
            h.worker.process(item);
        }
        let grammar = h.worker.analyzer.grammar().expect("grammar built on demand");

        store.run_exclusive(|txn| {
            txn.insert(|id| MprGroup {
                id,
                name: "irregular".into(),
                match_all: true,
            })
        });
        assert!(h.worker.analyzer.host().tracker().is_dirty());

        h.drain();
        assert!(Arc::ptr_eq(&grammar, &h.worker.analyzer.grammar().expect("grammar")), "no implicit rebuild");
        assert_eq!(h.filer.pending(), WORDS.len());
        assert_eq!(h.queue.depth(ParserPriority::Low), WORDS.len(), "unfiled updates still count");

        h.queue.push(WorkItem::Rebuild { force: false });
        h.drain();
        assert!(!Arc::ptr_eq(&grammar, &h.worker.analyzer.grammar().expect("grammar")));
        assert_eq!(h.idle.run_pending(), 1);
        assert_eq!(h.queue.depth(ParserPriority::Low), 0);

        let rebuilds = h.received().into_iter().filter(|e| matches!(e, ParserEvent::GrammarRebuilt { .. })).count();
        assert_eq!(rebuilds, 2);
    }

    #[test]
    fn test_interactive_gate_and_results() {
        let (store, _model) = fixture();
        let mut h = harness(store);
        h.shared.interactive_enabled.store(false, Ordering::Release);
        h.queue.push(WorkItem::Interactive {
            word: "cats".into(),
            trace: false,
            morph_filter: Default::default(),
        });
        h.drain();
        assert!(!h.received().iter().any(|e| matches!(e, ParserEvent::TryAWordResult { .. })));
        assert_eq!(h.queue.depth(ParserPriority::Interactive), 0, "skipped items still count as finished");

        h.shared.interactive_enabled.store(true, Ordering::Release);
        h.queue.push(WorkItem::Interactive {
            word: "cats".into(),
            trace: true,
            morph_filter: Default::default(),
        });
        h.drain();
        let results: Vec<(AnalysisResult, bool)> = h
            .received()
            .into_iter()
            .filter_map(|event| match event {
                ParserEvent::TryAWordResult { result, trace, .. } => Some((result, trace.is_some())),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.candidates.len(), 1);
        assert!(results[0].1);
    }

    #[test]
    fn test_lowercase_fallback() {
        let (store, model) = fixture();
        let mut h = harness(Arc::clone(&store));
        h.queue.push(update(&model, "Cats", ParserPriority::High));
        h.drain();
        assert_eq!(h.idle.run_pending(), 1);

        let wordform = model.wordform("Cats").expect("wordform");
        let analyses = store.read(|view| view.get::<Wordform>(wordform).map(|w| w.analyses.len()));
        assert_eq!(analyses, Some(1));
    }

    #[test]
    fn test_removed_wordform_is_skipped() {
        let (store, model) = fixture();
        let mut h = harness(Arc::clone(&store));
        let wordform = model.wordform("dog").expect("wordform");
        store.run_exclusive(|txn| txn.remove::<Wordform>(wordform));

        h.queue.push(update(&model, "dog", ParserPriority::Medium));
        h.drain();
        assert_eq!(h.filer.pending(), 0);
        assert!(h.received().iter().any(|e| matches!(
            e,
            ParserEvent::WordformUpdated { outcome: FilingOutcome::Skipped, priority: ParserPriority::Medium, .. }
        )));
    }

    #[test]
    fn test_panics_become_worker_failures() {
        let failure = guarded("boom item", || panic!("kaboom")).expect_err("panic caught");
        assert_eq!(failure.item, "boom item");
        assert_eq!(failure.message, "kaboom");
        assert!(guarded("fine", || {}).is_ok());
    }
}
