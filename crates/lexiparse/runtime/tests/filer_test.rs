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

//! Filing results into the store

mod common;

use lexidb_core::{Agent, ImportedModel, LexiconStore, Opinion, StoredAnalysis, TextReference, Wordform, WordformId};
use lexiparse_core::{AnalysisCandidate, AnalysisResult, MorphSegment};
use lexiparse_runtime::*;
use std::sync::Arc;
use tokio::sync::broadcast;

struct Setup {
    store: Arc<LexiconStore>,
    model: ImportedModel,
    idle: Arc<ManualIdleHost>,
    filer: Arc<ResultFiler>,
    events: broadcast::Receiver<ParserEvent>,
}

fn setup(policy: FilingPolicy) -> Setup {
    let (store, model) = common::model(&["cats", "bus"]);
    let idle = Arc::new(ManualIdleHost::new());
    let completions = Arc::new(Completions::new(EventBus::new(64), Arc::new(WorkQueue::new())));
    let events = completions.events().subscribe();
    let filer = ResultFiler::new(Arc::clone(&store), idle.clone(), completions, policy);
    Setup {
        store,
        model,
        idle,
        filer,
        events,
    }
}

fn morph(model: &ImportedModel, key: &str) -> MorphSegment {
    MorphSegment {
        form: model.allomorph(key).expect("allomorph"),
        msa: model.msa(key).expect("msa"),
        infl_type: None,
    }
}

fn cat_plural(model: &ImportedModel) -> AnalysisResult {
    AnalysisResult::new(vec![AnalysisCandidate::new(vec![morph(model, "cat"), morph(model, "PL")])])
}

fn analyses(store: &LexiconStore, wordform: WordformId) -> Vec<StoredAnalysis> {
    store.read(|view| {
        view.get::<Wordform>(wordform)
            .map(|w| w.analyses.iter().filter_map(|id| view.get::<StoredAnalysis>(*id).cloned()).collect())
            .unwrap_or_default()
    })
}

fn outcomes(events: &mut broadcast::Receiver<ParserEvent>) -> Vec<FilingOutcome> {
    common::drain(events)
        .into_iter()
        .filter_map(|event| match event {
            ParserEvent::WordformUpdated { outcome, .. } => Some(outcome),
            _ => None,
        })
        .collect()
}

impl Setup {
    fn file(&mut self, wordform: WordformId, result: AnalysisResult) {
        assert!(self.filer.file(wordform, ParserPriority::Medium, result, None));
        assert_eq!(self.idle.run_pending(), 1);
    }
}

#[test]
fn test_identical_result_is_filed_once() {
    let mut s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");

    s.file(cats, cat_plural(&s.model));
    let version = s.store.version();
    s.file(cats, cat_plural(&s.model));

    assert_eq!(s.store.version(), version, "second filing must not write");
    let stored = analyses(&s.store, cats);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].segments.len(), 2);
    assert_eq!(stored[0].machine_opinion, Opinion::Approves);
    assert_eq!(outcomes(&mut s.events), vec![FilingOutcome::Applied, FilingOutcome::Unchanged]);
}

#[test]
fn test_results_queue_until_idle() {
    let mut s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");
    let bus = s.model.wordform("bus").expect("bus");

    assert!(s.filer.file(cats, ParserPriority::High, cat_plural(&s.model), None));
    assert!(s.filer.file(bus, ParserPriority::Low, AnalysisResult::new(vec![AnalysisCandidate::new(vec![morph(&s.model, "bus")])]), None));
    assert_eq!(s.filer.pending(), 2);
    assert_eq!(s.idle.pending(), 1, "one apply pass for both results");
    assert!(analyses(&s.store, cats).is_empty());

    assert_eq!(s.idle.run_pending(), 1);
    assert_eq!(s.filer.pending(), 0);
    assert_eq!(analyses(&s.store, cats).len(), 1);
    assert_eq!(analyses(&s.store, bus).len(), 1);
    assert_eq!(outcomes(&mut s.events).len(), 2);
}

#[test]
fn test_human_approved_analysis_in_use_survives() {
    let mut s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");
    s.file(cats, cat_plural(&s.model));

    let approved = analyses(&s.store, cats)[0].id;
    s.store.run_exclusive(|txn| {
        txn.update::<StoredAnalysis>(approved, |a| a.set_opinion(Agent::Human, Opinion::Approves));
        txn.insert(|id| TextReference { id, analysis: approved });
    });

    let stem_only = AnalysisResult::new(vec![AnalysisCandidate::new(vec![morph(&s.model, "cat")])]);
    s.file(cats, stem_only);

    let stored = analyses(&s.store, cats);
    assert_eq!(stored.len(), 2);
    let kept = stored.iter().find(|a| a.id == approved).expect("human-approved analysis kept");
    assert_eq!(kept.human_opinion, Opinion::Approves);
    assert_eq!(kept.machine_opinion, Opinion::Disapproves);
}

#[test]
fn test_unused_neutral_analyses_follow_policy() {
    let mut s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");
    s.file(cats, cat_plural(&s.model));
    s.file(cats, AnalysisResult::new(Vec::new()));
    assert!(analyses(&s.store, cats).is_empty());

    let mut keep = setup(FilingPolicy {
        delete_unused_neutral: false,
        purge_invalid: true,
    });
    let cats = keep.model.wordform("cats").expect("cats");
    keep.file(cats, cat_plural(&keep.model));
    keep.file(cats, AnalysisResult::new(Vec::new()));
    let stored = analyses(&keep.store, cats);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].machine_opinion, Opinion::Neutral);
}

#[test]
fn test_failure_becomes_problem_marker() {
    let mut s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");
    s.file(cats, AnalysisResult::failed("too many analyses"));

    let problems: Vec<String> = s.store.read(|view| view.corpus().problems_for(cats).map(|p| p.message.clone()).collect());
    assert_eq!(problems, vec!["too many analyses".to_string()]);

    s.file(cats, cat_plural(&s.model));
    assert_eq!(s.store.read(|view| view.corpus().problems_for(cats).count()), 0);
    assert_eq!(analyses(&s.store, cats).len(), 1);
}

#[test]
fn test_removed_wordform_is_stale() {
    let mut s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");
    assert!(s.filer.file(cats, ParserPriority::Low, cat_plural(&s.model), None));
    s.store.run_exclusive(|txn| txn.remove::<Wordform>(cats));
    s.idle.run_pending();
    assert_eq!(outcomes(&mut s.events), vec![FilingOutcome::Stale]);
}

#[test]
fn test_closed_filer_refuses_results() {
    let s = setup(FilingPolicy::default());
    let cats = s.model.wordform("cats").expect("cats");
    s.filer.close();
    assert!(!s.filer.file(cats, ParserPriority::Low, cat_plural(&s.model), None));
    assert_eq!(s.idle.pending(), 0);
}
