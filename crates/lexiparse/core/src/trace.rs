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

//! Structured parse traces

use lexidb_core::MsaId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Restricts tracing to a set of morphemes; an empty selector traces everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSelector {
    morphemes: BTreeSet<MsaId>,
}

impl TraceSelector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(morphemes: impl IntoIterator<Item = MsaId>) -> Self {
        Self {
            morphemes: morphemes.into_iter().collect(),
        }
    }

    pub fn selects(&self, msa: MsaId) -> bool {
        self.morphemes.is_empty() || self.morphemes.contains(&msa)
    }

    pub fn selects_any(&self, msas: &[MsaId]) -> bool {
        self.morphemes.is_empty() || msas.iter().any(|m| self.morphemes.contains(m))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceStep {
    Tokenized { form: String },
    Untokenizable { offset: usize },
    PhonologyUnapplied { forms: Vec<String> },
    AffixStripped { msa: MsaId, gloss: String, remainder: String, depth: usize },
    StemLookup { form: String, msas: Vec<MsaId> },
    Rejected { morphs: Vec<MsaId>, reason: String },
    Accepted { morphs: Vec<MsaId> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceTree {
    pub word: String,
    pub engine: String,
    pub steps: Vec<TraceStep>,
}

impl TraceTree {
    pub fn accepted(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, TraceStep::Accepted { .. })).count()
    }
}

/// Collects trace steps when tracing was requested
pub struct Tracer {
    selector: Option<TraceSelector>,
    tree: TraceTree,
}

impl Tracer {
    pub fn new(word: &str, engine: &str, selector: Option<&TraceSelector>) -> Self {
        Self {
            selector: selector.cloned(),
            tree: TraceTree {
                word: word.to_string(),
                engine: engine.to_string(),
                steps: Vec::new(),
            },
        }
    }

    pub fn enabled(&self) -> bool {
        self.selector.is_some()
    }

    /// Record a step not tied to particular morphemes
    pub fn step(&mut self, step: impl FnOnce() -> TraceStep) {
        if self.enabled() {
            self.tree.steps.push(step());
        }
    }

    /// Record a step if the selector picks any of `msas`
    pub fn step_for(&mut self, msas: &[MsaId], step: impl FnOnce() -> TraceStep) {
        if self.selector.as_ref().is_some_and(|s| s.selects_any(msas)) {
            self.tree.steps.push(step());
        }
    }

    pub fn finish(self) -> TraceTree {
        self.tree
    }
}
