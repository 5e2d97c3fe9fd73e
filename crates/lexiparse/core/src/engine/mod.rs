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

//! Parsing engines
//!
//! Both engines share one pipeline: the surface word is tokenized, a
//! [`Strategy`] proposes candidate underlying forms and affix peelings, and
//! every resulting hypothesis is checked for morphotactics and resynthesized
//! before it is accepted. The strategies differ in how they undo affixation
//! and whether phonological rules take part.

pub mod phonology;
pub mod process;
pub mod segmenting;
pub mod synthesis;
pub mod tactics;
pub mod unification;

use crate::analysis::{AnalysisResult, NormalizedWord};
use crate::analyzer::EngineSettings;
use crate::trace::{TraceSelector, TraceStep, TraceTree, Tracer};
use lexidb_core::MsaId;
use lexiparse_compiler::{CompiledClass, CompiledGrammar, LexIndex, ProcessAllomorph, RuleIndex, SegId, Shape};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::debug;

pub use segmenting::SegmentingStrategy;
pub use unification::UnificationStrategy;

/// Upper bound on search nodes visited for one word
pub const MAX_SEARCH_STEPS: usize = 100_000;

/// A stem plus the affix rules applied to it, innermost first
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hypothesis {
    /// (lexical entry, stem allomorph)
    pub stem: (LexIndex, usize),
    /// (rule, rule allomorph)
    pub rules: Vec<(RuleIndex, usize)>,
}

impl Hypothesis {
    fn msas(&self, grammar: &CompiledGrammar) -> Vec<MsaId> {
        let stem = grammar.lexicon.get(self.stem.0).map(|e| e.msa);
        stem.into_iter().chain(self.rules.iter().filter_map(|(ri, _)| grammar.rules.get(*ri).map(|r| r.msa))).collect()
    }
}

/// How an engine undoes phonology and affixation
pub trait Strategy: Default + Send + Sync + 'static {
    const NAME: &'static str;

    /// Whether synthesis runs the phonological rules
    fn applies_phonology(&self) -> bool;

    /// Candidate underlying forms of a surface word
    fn underlying_forms(&self, grammar: &CompiledGrammar, surface: &[SegId], settings: &EngineSettings, tracer: &mut Tracer) -> Result<Vec<Shape>, String>;

    /// Inputs from which `process` could have produced `form`
    fn peel(&self, process: &ProcessAllomorph, form: &[SegId], classes: &[CompiledClass]) -> Vec<Shape>;
}

struct Search<'a, S> {
    strategy: &'a S,
    grammar: &'a CompiledGrammar,
    max_depth: usize,
    budget: usize,
    outer: Vec<(RuleIndex, usize)>,
    found: BTreeSet<Hypothesis>,
}

impl<S: Strategy> Search<'_, S> {
    fn strip(&mut self, form: &[SegId], tracer: &mut Tracer) -> Result<(), String> {
        self.budget = self.budget.checked_sub(1).ok_or("search limit exceeded")?;
        let grammar = self.grammar;

        let stems = grammar.lookup(form);
        if !stems.is_empty() {
            let msas: Vec<MsaId> = stems.iter().filter_map(|(lex, _)| grammar.lexicon.get(*lex).map(|e| e.msa)).collect();
            tracer.step_for(&msas, || TraceStep::StemLookup {
                form: grammar.symbols.render(form),
                msas: msas.clone(),
            });
            for stem in stems {
                self.found.insert(Hypothesis {
                    stem: *stem,
                    rules: self.outer.iter().rev().copied().collect(),
                });
            }
        }

        if self.outer.len() >= self.max_depth {
            return Ok(());
        }
        for (ri, rule) in grammar.rules.iter().enumerate() {
            for (ai, allomorph) in rule.allomorphs.iter().enumerate() {
                for inner in self.strategy.peel(&allomorph.process, form, &grammar.classes) {
                    let depth = self.outer.len() + 1;
                    tracer.step_for(&[rule.msa], || TraceStep::AffixStripped {
                        msa: rule.msa,
                        gloss: rule.gloss.clone(),
                        remainder: grammar.symbols.render(&inner),
                        depth,
                    });
                    self.outer.push((ri, ai));
                    let outcome = self.strip(&inner, tracer);
                    self.outer.pop();
                    outcome?;
                }
            }
        }
        Ok(())
    }
}

/// Analyze one word with `strategy`, optionally collecting a trace
pub fn parse<S: Strategy>(
    strategy: &S,
    grammar: Option<&CompiledGrammar>,
    word: &NormalizedWord,
    settings: &EngineSettings,
    selector: Option<&TraceSelector>,
) -> (AnalysisResult, Option<TraceTree>) {
    let started = Instant::now();
    let mut tracer = Tracer::new(word.as_str(), S::NAME, selector);
    let result = run(strategy, grammar, word, settings, &mut tracer).with_elapsed(started.elapsed());
    let tree = if tracer.enabled() { Some(tracer.finish()) } else { None };
    (result, tree)
}

fn run<S: Strategy>(strategy: &S, grammar: Option<&CompiledGrammar>, word: &NormalizedWord, settings: &EngineSettings, tracer: &mut Tracer) -> AnalysisResult {
    if word.is_empty() {
        return AnalysisResult::failed("empty word");
    }
    let Some(grammar) = grammar else {
        return AnalysisResult::failed("no grammar loaded");
    };

    let surface = match grammar.symbols.tokenize(word.as_str()) {
        Ok(surface) if !surface.is_empty() => surface,
        Ok(_) => return AnalysisResult::default(),
        Err(offset) => {
            debug!(word = %word, offset, "word contains unknown characters");
            tracer.step(|| TraceStep::Untokenizable { offset });
            return AnalysisResult::default();
        }
    };
    tracer.step(|| TraceStep::Tokenized {
        form: grammar.symbols.render(&surface),
    });

    let mut search = Search {
        strategy,
        grammar,
        max_depth: settings.max_affix_depth,
        budget: MAX_SEARCH_STEPS,
        outer: Vec::new(),
        found: BTreeSet::new(),
    };
    let forms = match strategy.underlying_forms(grammar, &surface, settings, tracer) {
        Ok(forms) => forms,
        Err(message) => return AnalysisResult::failed(message),
    };
    for form in &forms {
        if let Err(message) = search.strip(form, tracer) {
            return AnalysisResult::failed(message);
        }
    }

    let mut candidates = BTreeSet::new();
    for hyp in &search.found {
        let msas = hyp.msas(grammar);
        let outcome = tactics::check(grammar, hyp).and_then(|info| synthesis::verify(grammar, hyp, &info, &surface, strategy.applies_phonology()));
        match outcome {
            Ok(candidate) => {
                tracer.step_for(&msas, || TraceStep::Accepted { morphs: msas.clone() });
                candidates.insert(candidate);
            }
            Err(reason) => tracer.step_for(&msas, || TraceStep::Rejected { morphs: msas.clone(), reason }),
        }
    }

    if candidates.len() > settings.max_analyses {
        return AnalysisResult::failed(format!("word has more than {} analyses", settings.max_analyses));
    }
    AnalysisResult::new(candidates.into_iter().collect())
}
