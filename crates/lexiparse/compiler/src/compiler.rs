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

//! Grammar compilation pipeline

use crate::constraints::build_co_occurrences;
use crate::environment::EnvParser;
use crate::error::{CompileError, CompileErrorSink};
use crate::features::FeatureStruct;
use crate::grammar::{CompiledClass, CompiledGrammar};
use crate::lexicon::build_lexicon;
use crate::morphology::{REDUPLICATION_PATTERN, build_null_affixes, build_templates};
use crate::phonology::build_phon_rules;
use crate::symbols::{SegId, SymbolTable};
use lexidb_core::{ClassMembers, LinguisticModel, ModelSnapshot, PhonemeId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Synthesize null affixes for slots satisfied by irregularly inflected variants
    pub null_affixes: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { null_affixes: true }
    }
}

/// Outcome of one compile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    pub lexical_entries: usize,
    pub rules: usize,
    pub templates: usize,
    pub phon_rules: usize,
    pub errors: usize,
    pub stage_times: Vec<(String, Duration)>,
}

impl CompileStats {
    pub fn total_time(&self) -> Duration {
        self.stage_times.iter().map(|(_, t)| *t).sum()
    }
}

/// Read-only inputs shared by the build stages
pub(crate) struct BuildContext<'a> {
    pub model: &'a LinguisticModel,
    pub symbols: &'a SymbolTable,
    pub classes: &'a [CompiledClass],
    pub class_names: &'a HashMap<String, usize>,
    pub reduplication: Option<&'a Regex>,
}

impl BuildContext<'_> {
    pub fn env_parser(&self) -> EnvParser<'_> {
        EnvParser::new(self.symbols, self.class_names)
    }
}

struct CountingSink<'a> {
    inner: &'a mut dyn CompileErrorSink,
    count: usize,
}

impl CompileErrorSink for CountingSink<'_> {
    fn report(&mut self, error: CompileError) {
        self.count += 1;
        self.inner.report(error);
    }
}

/// Translates a model snapshot into a [`CompiledGrammar`]
#[derive(Debug, Clone, Default)]
pub struct GrammarCompiler {
    config: CompilerConfig,
}

impl GrammarCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `snapshot`; items that fail to build are reported to `sink` and left out
    pub fn compile(&self, snapshot: &ModelSnapshot, sink: &mut dyn CompileErrorSink) -> CompiledGrammar {
        self.compile_with_stats(snapshot, sink).0
    }

    pub fn compile_with_stats(&self, snapshot: &ModelSnapshot, sink: &mut dyn CompileErrorSink) -> (CompiledGrammar, CompileStats) {
        let model: &LinguisticModel = snapshot;
        let mut sink = CountingSink { inner: sink, count: 0 };
        let mut stats = CompileStats::default();
        let started = Instant::now();
        let symbols = build_symbols(model, &mut sink);
        let (classes, class_names) = build_classes(model, &symbols, &mut sink);
        stage(&mut stats, "symbols", started);

        let reduplication = Regex::new(REDUPLICATION_PATTERN).ok();
        let ctx = BuildContext {
            model,
            symbols: &symbols,
            classes: &classes,
            class_names: &class_names,
            reduplication: reduplication.as_ref(),
        };

        let started = Instant::now();
        let (lexicon, rules) = build_lexicon(&ctx, &mut sink);
        stage(&mut stats, "lexicon", started);

        let started = Instant::now();
        let null_affixes = if self.config.null_affixes { build_null_affixes(&ctx, &lexicon, &mut sink) } else { Vec::new() };
        let templates = build_templates(&ctx, &rules, &null_affixes, &mut sink);
        stage(&mut stats, "templates", started);

        let started = Instant::now();
        let phon_rules = build_phon_rules(&ctx, &mut sink);
        let co_occurrences = build_co_occurrences(&ctx, &mut sink);
        stage(&mut stats, "phonology", started);

        let mut grammar = CompiledGrammar {
            model_version: snapshot.version(),
            symbols,
            classes,
            lexicon,
            rules,
            templates,
            null_affixes,
            phon_rules,
            co_occurrences,
            pos_parents: model.parts_of_speech.values().map(|p| (p.id, p.parent)).collect(),
            infl_class_parents: model.infl_classes.values().map(|c| (c.id, c.parent)).collect(),
            mpr_groups: model
                .mpr_features
                .values()
                .map(|f| (f.id, (f.group, f.group.and_then(|g| model.mpr_groups.get(&g)).is_none_or(|g| g.match_all))))
                .collect(),
            slot_optional: model.slots.values().map(|s| (s.id, s.optional)).collect(),
            shape_index: HashMap::new(),
        };
        grammar.index_lexicon();

        stats.lexical_entries = grammar.lexicon.len();
        stats.rules = grammar.rules.len();
        stats.templates = grammar.templates.len();
        stats.phon_rules = grammar.phon_rules.len();
        stats.errors = sink.count;
        info!(
            version = grammar.model_version,
            entries = stats.lexical_entries,
            rules = stats.rules,
            templates = stats.templates,
            phon_rules = stats.phon_rules,
            errors = stats.errors,
            elapsed_ms = stats.total_time().as_millis() as u64,
            "grammar compiled"
        );
        (grammar, stats)
    }
}

fn stage(stats: &mut CompileStats, name: &str, started: Instant) {
    let elapsed = started.elapsed();
    debug!(stage = name, elapsed_us = elapsed.as_micros() as u64, "compile stage finished");
    stats.stage_times.push((name.to_string(), elapsed));
}

fn build_symbols(model: &LinguisticModel, sink: &mut dyn CompileErrorSink) -> SymbolTable {
    let mut symbols = SymbolTable::build(model);
    let ids: Vec<(SegId, PhonemeId)> = symbols.segments().map(|(id, seg)| (id, seg.phoneme)).collect();
    for (seg, phoneme) in ids {
        let Some(source) = model.phonemes.get(&phoneme) else { continue };
        match FeatureStruct::from_specs(&source.features, model, phoneme) {
            Ok(features) => symbols.segment_mut(seg).features = features,
            Err(err) => sink.report(err),
        }
    }
    symbols
}

fn build_classes(model: &LinguisticModel, symbols: &SymbolTable, sink: &mut dyn CompileErrorSink) -> (Vec<CompiledClass>, HashMap<String, usize>) {
    let by_phoneme: HashMap<PhonemeId, SegId> = symbols.segments().map(|(id, seg)| (seg.phoneme, id)).collect();
    let mut classes = Vec::new();
    let mut names = HashMap::new();
    for class in model.natural_classes.values() {
        let members: BTreeSet<SegId> = match &class.members {
            ClassMembers::Segments(phonemes) => {
                let mut members = BTreeSet::new();
                for phoneme in phonemes {
                    match by_phoneme.get(phoneme) {
                        Some(seg) => {
                            members.insert(*seg);
                        }
                        None => sink.report(CompileError::DanglingReference {
                            owner: class.id.into(),
                            target: (*phoneme).into(),
                        }),
                    }
                }
                members
            }
            ClassMembers::Features(specs) => match FeatureStruct::from_specs(specs, model, class.id) {
                Ok(required) => symbols.segments().filter(|(_, seg)| seg.features.subsumed_by(&required)).map(|(id, _)| id).collect(),
                Err(err) => {
                    sink.report(err);
                    continue;
                }
            },
        };
        names.insert(class.abbreviation.clone(), classes.len());
        classes.push(CompiledClass {
            source: class.id,
            abbreviation: class.abbreviation.clone(),
            members,
        });
    }
    (classes, names)
}
