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

//! Morphotactic checks on a hypothesized analysis
//!
//! A hypothesis is walked from the stem outwards. Derivational affixes must
//! sit inside inflectional ones and clitics outside both; parts of speech,
//! inflection classes and features are threaded through every step. The
//! inflectional affixes must then fit an affix template of the final part of
//! speech.

use super::Hypothesis;
use super::phonology::WordContext;
use lexidb_core::{Adjacency, AllomorphId, InflClassId, InflTypeId, PosId};
use lexiparse_compiler::{CompiledGrammar, CompiledSlot, CompiledTemplate, RuleIndex, RuleRole};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Derivation,
    Inflection,
    Clitic,
}

fn pos_matches(grammar: &CompiledGrammar, actual: Option<PosId>, required: Option<PosId>) -> bool {
    match (actual, required) {
        (_, None) => true,
        (Some(actual), Some(required)) => grammar.pos_descends_from(actual, required),
        (None, Some(_)) => false,
    }
}

fn class_matches(grammar: &CompiledGrammar, actual: Option<InflClassId>, required: Option<InflClassId>) -> bool {
    match (actual, required) {
        (_, None) => true,
        (Some(actual), Some(required)) => grammar.infl_class_descends_from(actual, required),
        (None, Some(_)) => false,
    }
}

/// Validate the morphotactics of `hyp`, returning the properties of the finished word
pub fn check(grammar: &CompiledGrammar, hyp: &Hypothesis) -> Result<WordContext, String> {
    let entry = grammar.lexicon.get(hyp.stem.0).ok_or("unknown stem")?;
    let stem = entry.allomorphs.get(hyp.stem.1).ok_or("unknown stem allomorph")?;

    let mut pos = entry.pos;
    let mut infl_class = entry.infl_class;
    let mut features = entry.features.clone();
    let mut exceptions: BTreeSet<_> = entry.exception_features.iter().copied().collect();
    let mut phase = Phase::Derivation;
    let mut affixed = false;
    let mut inflectional = Vec::new();

    for &(ri, ai) in &hyp.rules {
        let rule = grammar.rules.get(ri).ok_or("unknown rule")?;
        let allomorph = rule.allomorphs.get(ai).ok_or("unknown rule allomorph")?;
        match &rule.role {
            RuleRole::Derivational {
                from_pos,
                to_pos,
                from_infl_class,
                to_infl_class,
                from_features,
                to_features,
            } => {
                if phase > Phase::Derivation {
                    return Err(format!("derivational affix '{}' outside inflection", rule.gloss));
                }
                if !pos_matches(grammar, pos, *from_pos) {
                    return Err(format!("'{}' does not attach to this part of speech", rule.gloss));
                }
                if !class_matches(grammar, infl_class, *from_infl_class) {
                    return Err(format!("'{}' does not attach to this inflection class", rule.gloss));
                }
                let unified = features.unify(from_features).ok_or_else(|| format!("feature clash with '{}'", rule.gloss))?;
                if to_pos.is_some() {
                    pos = *to_pos;
                    features = to_features.clone();
                    infl_class = *to_infl_class;
                } else {
                    features = unified.overlay(to_features);
                    infl_class = to_infl_class.or(infl_class);
                }
            }
            RuleRole::Inflectional { pos: required, features: carried, .. } => {
                if phase > Phase::Inflection {
                    return Err(format!("inflectional affix '{}' outside a clitic", rule.gloss));
                }
                phase = Phase::Inflection;
                if !pos_matches(grammar, pos, *required) {
                    return Err(format!("'{}' does not inflect this part of speech", rule.gloss));
                }
                features = features.unify(carried).ok_or_else(|| format!("feature clash with '{}'", rule.gloss))?;
                inflectional.push(ri);
            }
            RuleRole::Unclassified { pos: required } => {
                if phase > Phase::Derivation {
                    return Err(format!("unclassified affix '{}' outside inflection", rule.gloss));
                }
                if !pos_matches(grammar, pos, *required) {
                    return Err(format!("'{}' does not attach to this part of speech", rule.gloss));
                }
            }
            RuleRole::Clitic => phase = Phase::Clitic,
        }
        if !matches!(rule.role, RuleRole::Clitic) {
            affixed = true;
        }
        if !allomorph.infl_classes.is_empty() && !allomorph.infl_classes.iter().any(|c| class_matches(grammar, infl_class, Some(*c))) {
            return Err(format!("allomorph of '{}' excluded by inflection class", rule.gloss));
        }
        exceptions.extend(rule.exception_features.iter().copied());
    }

    if stem.bound && !affixed {
        return Err(format!("bound stem '{}' without affixes", entry.gloss));
    }
    check_templates(grammar, pos, entry.infl_type, &inflectional)?;
    Ok(WordContext {
        pos,
        exception_features: exceptions,
    })
}

fn check_templates(grammar: &CompiledGrammar, pos: Option<PosId>, infl_type: Option<InflTypeId>, rules: &[RuleIndex]) -> Result<(), String> {
    let templates: Vec<&CompiledTemplate> = match pos {
        Some(pos) => grammar.templates.iter().filter(|t| grammar.pos_descends_from(pos, t.pos)).collect(),
        None => Vec::new(),
    };
    if templates.is_empty() {
        return if rules.is_empty() {
            Ok(())
        } else {
            Err("inflectional affixes without an affix template".to_string())
        };
    }

    let (mut prefixes, suffixes): (Vec<RuleIndex>, Vec<RuleIndex>) = rules.iter().partition(|ri| grammar.rules[**ri].kind.is_prefixal());
    prefixes.reverse();
    if templates
        .iter()
        .any(|t| fits(&t.prefix_slots, &prefixes, infl_type) && fits(&t.suffix_slots, &suffixes, infl_type))
    {
        Ok(())
    } else {
        Err("affixes do not fit any affix template".to_string())
    }
}

/// Whether `rules`, in surface order, can fill `slots` in order
fn fits(slots: &[CompiledSlot], rules: &[RuleIndex], infl_type: Option<InflTypeId>) -> bool {
    let Some((slot, rest)) = slots.split_first() else {
        return rules.is_empty();
    };
    let null_filled = infl_type.is_some_and(|t| slot.null_for.contains(&t));
    if null_filled {
        return fits(rest, rules, infl_type);
    }
    if let Some((rule, remaining)) = rules.split_first() {
        if slot.rules.contains(rule) && fits(rest, remaining, infl_type) {
            return true;
        }
    }
    slot.optional && fits(rest, rules, infl_type)
}

/// Reject morph sequences that break a co-occurrence constraint
pub fn check_co_occurrence(grammar: &CompiledGrammar, morphs: &[AllomorphId]) -> Result<(), String> {
    for constraint in &grammar.co_occurrences {
        for (i, key) in morphs.iter().enumerate() {
            if *key != constraint.key {
                continue;
            }
            let violated = morphs.iter().enumerate().any(|(j, other)| {
                *other == constraint.other
                    && match constraint.adjacency {
                        Adjacency::Anywhere => i != j,
                        Adjacency::SomewhereToLeft => j < i,
                        Adjacency::SomewhereToRight => j > i,
                        Adjacency::AdjacentToLeft => j + 1 == i,
                        Adjacency::AdjacentToRight => j == i + 1,
                    }
            });
            if violated {
                return Err(format!("co-occurrence constraint {} violated", constraint.source));
            }
        }
    }
    Ok(())
}
