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

//! The scheduler end to end: queue, worker thread, filing and events

mod common;

use lexidb_core::{StoredAnalysis, Wordform};
use lexiparse_runtime::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn is_idle(event: &ParserEvent) -> bool {
    matches!(event, ParserEvent::TaskStatus(TaskStatus::Idle))
}

#[test]
fn test_wordform_update_is_filed_once() {
    let (store, model) = common::model(&["cats"]);
    let idle = Arc::new(ManualIdleHost::new());
    let scheduler = ParserScheduler::start(Arc::clone(&store), &ParserConfig::default(), idle.clone()).expect("start");
    let mut events = scheduler.subscribe();

    let cats = model.wordform("cats").expect("cats");
    scheduler.schedule_wordform_update(cats, ParserPriority::Medium).expect("schedule");
    common::wait_until(|| scheduler.filer().pending() == 1);

    // Analyzed but not yet filed: the update is still outstanding
    assert_eq!(scheduler.queue_depth(ParserPriority::Medium), 1);
    assert!(!scheduler.is_idle());
    assert!(!common::drain(&mut events).iter().any(is_idle));

    assert_eq!(idle.run_pending(), 1);
    let seen = common::wait_for(&mut events, is_idle);
    let updated: Vec<_> = seen
        .iter()
        .filter_map(|event| match event {
            ParserEvent::WordformUpdated { wordform, priority, outcome } => Some((*wordform, *priority, *outcome)),
            _ => None,
        })
        .collect();
    assert_eq!(updated, vec![(cats, ParserPriority::Medium, FilingOutcome::Applied)]);
    assert_eq!(scheduler.queue_depth(ParserPriority::Medium), 0);

    let segments: Vec<usize> = store.read(|view| {
        view.get::<Wordform>(cats)
            .map(|w| w.analyses.iter().filter_map(|id| view.get::<StoredAnalysis>(*id)).map(|a| a.segments.len()).collect())
            .unwrap_or_default()
    });
    assert_eq!(segments, vec![2]);
}

#[test]
fn test_interactive_unknown_word_is_an_empty_parse() {
    let (store, _model) = common::model(&[]);
    let scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    let mut events = scheduler.subscribe();

    scheduler.schedule_interactive_analyze("xyz123", false, BTreeSet::new()).expect("schedule");
    let seen = common::wait_for(&mut events, |e| matches!(e, ParserEvent::TryAWordResult { .. }));
    let Some(ParserEvent::TryAWordResult { word, result, trace }) = seen.last() else {
        panic!("expected a result");
    };
    assert_eq!(word, "xyz123");
    assert!(result.candidates.is_empty());
    assert_eq!(result.error, None);
    assert!(trace.is_none());
}

#[test]
fn test_interactive_trace_is_reported() {
    let (store, _model) = common::model(&[]);
    let scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    let mut events = scheduler.subscribe();

    scheduler.schedule_interactive_analyze("cats", true, BTreeSet::new()).expect("schedule");
    let seen = common::wait_for(&mut events, |e| matches!(e, ParserEvent::TryAWordResult { .. }));
    let Some(ParserEvent::TryAWordResult { result, trace: Some(trace), .. }) = seen.last() else {
        panic!("expected a traced result");
    };
    assert_eq!(result.candidates.len(), 1);
    assert_eq!(trace.accepted(), 1);
    assert!(seen.iter().any(|e| matches!(e, ParserEvent::GrammarRebuilt { errors: 0, .. })));
}

#[test]
fn test_batch_completes_once_after_every_wordform() {
    let words = ["cat", "cats", "bus"];
    let (store, model) = common::model(&words);
    let idle = Arc::new(ThreadIdleHost::spawn().expect("idle host"));
    let scheduler = ParserScheduler::start(store, &ParserConfig::default(), idle).expect("start");
    let mut events = scheduler.subscribe();

    let wordforms: Vec<_> = words.iter().map(|w| model.wordform(w).expect("wordform")).collect();
    let batch = scheduler.schedule_batch(&wordforms, ParserPriority::Low, true).expect("schedule").expect("tracked");

    let seen = common::wait_for(&mut events, |e| matches!(e, ParserEvent::BatchComplete(_)));
    assert!(matches!(seen.last(), Some(ParserEvent::BatchComplete(id)) if *id == batch));
    let mut completed: Vec<_> = seen
        .iter()
        .filter_map(|event| match event {
            ParserEvent::WordformUpdated { wordform, .. } => Some(*wordform),
            _ => None,
        })
        .collect();
    completed.sort();
    let mut expected = wordforms.clone();
    expected.sort();
    assert_eq!(completed, expected);

    std::thread::sleep(Duration::from_millis(50));
    assert!(!common::drain(&mut events).iter().any(|e| matches!(e, ParserEvent::BatchComplete(_))));
}

#[test]
fn test_untracked_batch_has_no_id() {
    let (store, model) = common::model(&["cat"]);
    let scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    let cat = model.wordform("cat").expect("cat");
    assert_eq!(scheduler.schedule_batch(&[cat], ParserPriority::High, false).expect("schedule"), None);
}

#[test]
fn test_update_priorities_are_validated() {
    let (store, model) = common::model(&["cat"]);
    let scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    let cat = model.wordform("cat").expect("cat");

    for priority in [ParserPriority::RebuildGrammar, ParserPriority::Interactive] {
        assert!(matches!(scheduler.schedule_wordform_update(cat, priority), Err(ParserError::InvalidPriority(p)) if p == priority));
        assert!(matches!(scheduler.schedule_batch(&[cat], priority, true), Err(ParserError::InvalidPriority(_))));
    }
}

#[test]
fn test_disabled_interactive_requests_are_dropped() {
    let (store, _model) = common::model(&[]);
    let scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    let mut events = scheduler.subscribe();

    scheduler.set_interactive_enabled(false);
    assert!(!scheduler.interactive_enabled());
    scheduler.schedule_interactive_analyze("cats", false, BTreeSet::new()).expect("schedule");
    scheduler.schedule_rebuild().expect("schedule");

    let seen = common::wait_for(&mut events, is_idle);
    assert!(seen.iter().any(|e| matches!(e, ParserEvent::GrammarRebuilt { .. })));
    assert!(!seen.iter().any(|e| matches!(e, ParserEvent::TryAWordResult { .. })));
    assert_eq!(scheduler.queue_depth(ParserPriority::Interactive), 0);
}

#[test]
fn test_shutdown_rejects_new_work() {
    let (store, _model) = common::model(&[]);
    let mut scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    scheduler.shutdown();
    assert!(matches!(scheduler.schedule_rebuild(), Err(ParserError::ShutDown)));
    assert!(scheduler.filer().pending() == 0);
    assert!(scheduler.last_unhandled_error().is_none());
}

#[test]
fn test_shutdown_drops_outstanding_work() {
    let (store, model) = common::model(&["cat", "cats", "bus"]);
    let mut scheduler = ParserScheduler::start(store, &ParserConfig::default(), Arc::new(ManualIdleHost::new())).expect("start");
    let wordforms: Vec<_> = ["cat", "cats", "bus"].iter().map(|w| model.wordform(w).expect("wordform")).collect();
    scheduler.schedule_batch(&wordforms, ParserPriority::Low, true).expect("schedule");

    scheduler.shutdown();
    for level in ParserPriority::ALL {
        assert_eq!(scheduler.queue_depth(level), 0, "{level}");
    }
    assert!(scheduler.is_idle());
}

#[test]
fn test_rebuild_writes_diagnostics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, _model) = common::model(&[]);
    let config = ParserConfig {
        data_dir: Some(dir.path().join("parser")),
        ..ParserConfig::default()
    };
    let scheduler = ParserScheduler::start(store, &config, Arc::new(ManualIdleHost::new())).expect("start");
    let mut events = scheduler.subscribe();

    scheduler.schedule_reload().expect("schedule");
    common::wait_for(&mut events, |e| matches!(e, ParserEvent::GrammarRebuilt { .. }));
    assert!(dir.path().join("parser").join(lexiparse_core::GRAMMAR_SUMMARY_FILE).is_file());
}
