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

//! Grammar compilation and word analysis benchmarks

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use lexidb_core::{LexiconStore, ModelDocument};
use lexiparse_compiler::{CompileError, GrammarCompiler};
use lexiparse_core::*;
use std::sync::Arc;

const STEMS: &[&str] = &["cat", "dog", "bus", "pig", "rat", "cow", "owl", "ant", "bee", "elk"];

fn model() -> serde_json::Value {
    let mut entries: Vec<serde_json::Value> = STEMS
        .iter()
        .map(|stem| serde_json::json!({ "key": stem, "forms": [{ "form": stem, "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] }))
        .collect();
    entries.push(serde_json::json!({ "key": "PL", "forms": [{ "form": "-s", "type": "suffix" }], "msas": [{ "kind": "infl", "pos": "n", "slots": ["NUM"] }] }));
    entries.push(serde_json::json!({ "key": "DIM", "forms": [{ "form": "-let", "type": "suffix" }], "msas": [{ "kind": "deriv", "from_pos": "n", "to_pos": "n" }] }));
    serde_json::json!({
        "phonemes": "abcdegiklmnoprstuwy".chars().map(|c| serde_json::json!({ "name": c.to_string() })).collect::<Vec<_>>(),
        "parts_of_speech": [{ "abbr": "n", "slots": [{ "name": "NUM", "optional": true }], "templates": [{ "name": "noun", "suffix_slots": ["NUM"] }] }],
        "phon_rules": [{ "name": "epenthesis", "kind": "rewrite", "input": "", "subrules": [{ "output": "e", "left": "s", "right": "s#" }] }],
        "entries": entries
    })
}

fn store() -> Arc<LexiconStore> {
    let store = Arc::new(LexiconStore::new());
    ModelDocument::from_value(model()).expect("model").import(&store).expect("import");
    store
}

fn bench_compile(c: &mut Criterion) {
    let store = store();
    let compiler = GrammarCompiler::default();
    c.bench_function("compile_grammar", |b| {
        b.iter(|| {
            let mut errors: Vec<CompileError> = Vec::new();
            compiler.compile(black_box(&store.snapshot()), &mut errors)
        })
    });
}

fn bench_analyze(c: &mut Criterion) {
    let words: Vec<NormalizedWord> = ["cats", "buses", "doglets", "owl", "xyz"].iter().map(|w| NormalizedWord::new(w)).collect();

    let mut group = c.benchmark_group("analyze");
    group.throughput(Throughput::Elements(words.len() as u64));
    for kind in [AnalyzerKind::Unification, AnalyzerKind::Segmenting] {
        let mut engine = AnalyzerEngine::new(kind, GrammarHost::new(store(), GrammarCompiler::default()), EngineSettings::default());
        let mut errors: Vec<CompileError> = Vec::new();
        engine.rebuild(&mut errors).expect("rebuild");
        group.bench_function(kind.as_str(), |b| b.iter(|| words.iter().map(|w| engine.analyze(black_box(w)).candidates.len()).sum::<usize>()));
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_analyze);
criterion_main!(benches);
