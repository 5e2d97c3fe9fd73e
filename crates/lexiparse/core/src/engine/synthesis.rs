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

//! Forward synthesis of a hypothesis
//!
//! Every analysis proposed by an engine is rebuilt from its underlying
//! morphemes and accepted only if it reproduces the surface form exactly.

use super::phonology::{self, WordContext};
use super::{Hypothesis, process, tactics};
use crate::analysis::{AnalysisCandidate, MorphSegment};
use lexidb_core::AllomorphId;
use lexiparse_compiler::{CompiledGrammar, SegId, environment::any_matches};

/// Span of the material contributed by morph `morph`, if it has any
fn span(origins: &[usize], morph: usize) -> Option<(usize, usize)> {
    let start = origins.iter().position(|o| *o == morph)?;
    let end = origins.iter().rposition(|o| *o == morph)? + 1;
    Some((start, end))
}

pub fn verify(grammar: &CompiledGrammar, hyp: &Hypothesis, word: &WordContext, surface: &[SegId], apply_phonology: bool) -> Result<AnalysisCandidate, String> {
    let classes = &grammar.classes;
    let entry = grammar.lexicon.get(hyp.stem.0).ok_or("unknown stem")?;
    let stem = entry.allomorphs.get(hyp.stem.1).ok_or("unknown stem allomorph")?;

    let mut shape = stem.shape.clone();
    let mut origins = vec![0; shape.len()];
    let mut morphs = vec![MorphSegment {
        form: stem.source,
        msa: entry.msa,
        infl_type: entry.infl_type,
    }];
    let mut environments = vec![stem.environments.as_slice()];

    for (k, &(ri, ai)) in hyp.rules.iter().enumerate() {
        let rule = grammar.rules.get(ri).ok_or("unknown rule")?;
        let allomorph = rule.allomorphs.get(ai).ok_or("unknown rule allomorph")?;
        let (next, tags) = process::apply(&allomorph.process, &shape, &origins, k + 1, classes).ok_or_else(|| format!("'{}' does not apply", rule.gloss))?;
        shape = next;
        origins = tags;
        morphs.push(MorphSegment {
            form: allomorph.source,
            msa: rule.msa,
            infl_type: None,
        });
        environments.push(allomorph.environments.as_slice());
    }

    let mut placed: Vec<(usize, usize)> = Vec::with_capacity(morphs.len());
    for (morph, envs) in environments.iter().enumerate() {
        let Some((start, end)) = span(&origins, morph) else { continue };
        if !any_matches(envs, &shape, start, end, classes) {
            return Err(format!("environment of allomorph {} not met", morphs[morph].form));
        }
        placed.push((start, morph));
    }
    placed.sort_unstable();
    let ordered: Vec<MorphSegment> = placed.iter().map(|(_, morph)| morphs[*morph]).collect();

    let forms: Vec<AllomorphId> = ordered.iter().map(|m| m.form).collect();
    tactics::check_co_occurrence(grammar, &forms)?;

    let produced = if apply_phonology { phonology::apply_all(grammar, shape, word) } else { shape };
    if produced != surface {
        return Err(format!("synthesizes '{}'", grammar.symbols.render(&produced)));
    }
    Ok(AnalysisCandidate::new(ordered))
}
