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

//! Forward application and bounded unapplication of phonological rules
//!
//! Rules apply simultaneously: contexts are matched against the form as it
//! was before the rule, and matches do not overlap. Unapplication works on the
//! surface form and over-generates; every hypothesis is later checked by
//! forward synthesis.

use lexidb_core::{MprFeatureId, PosId};
use lexiparse_compiler::{CompiledClass, CompiledGrammar, CompiledPhonRule, CompiledPhonRuleKind, CompiledSubrule, EnvItem, SegId, Shape};
use std::collections::BTreeSet;

/// Cap on the input realizations a class-bearing rule may unapply to
const MAX_REALIZATIONS: usize = 64;

/// Word properties that gate rule application
#[derive(Debug, Clone, Default)]
pub struct WordContext {
    pub pos: Option<PosId>,
    pub exception_features: BTreeSet<MprFeatureId>,
}

fn matches_at(items: &[EnvItem], form: &[SegId], at: usize, classes: &[CompiledClass]) -> bool {
    at + items.len() <= form.len() && items.iter().zip(&form[at..]).all(|(item, seg)| item.accepts(*seg, classes))
}

fn subrule_applies(grammar: &CompiledGrammar, subrule: &CompiledSubrule, word: &WordContext) -> bool {
    subrule.required_pos.is_empty() || word.pos.is_some_and(|pos| subrule.required_pos.iter().any(|r| grammar.pos_descends_from(pos, *r)))
}

/// Run every rule over an underlying form in application order
pub fn apply_all(grammar: &CompiledGrammar, form: Shape, word: &WordContext) -> Shape {
    grammar
        .phon_rules
        .iter()
        .filter(|rule| grammar.mpr_satisfied(&rule.required_mpr, &rule.excluded_mpr, &word.exception_features))
        .fold(form, |form, rule| apply_rule(grammar, rule, &form, word))
}

pub fn apply_rule(grammar: &CompiledGrammar, rule: &CompiledPhonRule, form: &[SegId], word: &WordContext) -> Shape {
    let classes = &grammar.classes;
    match &rule.kind {
        CompiledPhonRuleKind::Rewrite { input, subrules } => {
            let subrules: Vec<&CompiledSubrule> = subrules.iter().filter(|s| subrule_applies(grammar, s, word)).collect();
            let firing = |start: usize, end: usize| {
                subrules
                    .iter()
                    .find(|s| s.left.matches_left(form, start, classes) && s.right.matches_right(form, end, classes))
                    .copied()
            };
            let mut out = Shape::with_capacity(form.len() + 2);
            if input.is_empty() {
                for pos in 0..=form.len() {
                    if let Some(subrule) = firing(pos, pos) {
                        out.extend_from_slice(&subrule.output);
                    }
                    if pos < form.len() {
                        out.push(form[pos]);
                    }
                }
                return out;
            }
            let mut pos = 0;
            while pos < form.len() {
                let end = pos + input.len();
                if matches_at(input, form, pos, classes) {
                    if let Some(subrule) = firing(pos, end) {
                        out.extend_from_slice(&subrule.output);
                        pos = end;
                        continue;
                    }
                }
                out.push(form[pos]);
                pos += 1;
            }
            out
        }
        CompiledPhonRuleKind::Metathesis {
            left,
            left_switch,
            right_switch,
            right,
        } => {
            let (a, b) = (left_switch.len(), right_switch.len());
            let mut out = Shape::with_capacity(form.len());
            let mut pos = 0;
            while pos < form.len() {
                let end = pos + a + b;
                if matches_at(left_switch, form, pos, classes)
                    && matches_at(right_switch, form, pos + a, classes)
                    && left.matches_left(form, pos, classes)
                    && right.matches_right(form, end, classes)
                {
                    out.extend_from_slice(&form[pos + a..end]);
                    out.extend_from_slice(&form[pos..pos + a]);
                    pos = end;
                    continue;
                }
                out.push(form[pos]);
                pos += 1;
            }
            out
        }
    }
}

/// Every sequence of segments a rule input may stand for
fn realizations(items: &[EnvItem], classes: &[CompiledClass]) -> Vec<Shape> {
    let mut shapes = vec![Shape::new()];
    for item in items {
        let options: Vec<SegId> = match item {
            EnvItem::Segment(s) => vec![*s],
            EnvItem::Class(c) => classes.get(*c).map(|class| class.members.iter().copied().collect()).unwrap_or_default(),
            EnvItem::Optional(_) => Vec::new(),
        };
        shapes = shapes
            .into_iter()
            .flat_map(|prefix| {
                options.iter().map(move |seg| {
                    let mut next = prefix.clone();
                    next.push(*seg);
                    next
                })
            })
            .take(MAX_REALIZATIONS)
            .collect();
    }
    shapes
}

fn splice(form: &[SegId], start: usize, end: usize, replacement: &[SegId]) -> Shape {
    let mut out = Shape::with_capacity(form.len() + replacement.len());
    out.extend_from_slice(&form[..start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&form[end..]);
    out
}

/// Forms from which one application of `rule` could have produced `form`
pub fn unapply_rule(grammar: &CompiledGrammar, rule: &CompiledPhonRule, form: &[SegId]) -> Vec<Shape> {
    let classes = &grammar.classes;
    let mut variants = Vec::new();
    match &rule.kind {
        CompiledPhonRuleKind::Rewrite { input, subrules } => {
            let inputs = realizations(input, classes);
            for subrule in subrules {
                let out_len = subrule.output.len();
                let sites: Vec<usize> = (0..=form.len().saturating_sub(out_len))
                    .filter(|&pos| {
                        form[pos..].starts_with(&subrule.output)
                            && subrule.left.matches_left(form, pos, classes)
                            && subrule.right.matches_right(form, pos + out_len, classes)
                    })
                    .collect();
                for &pos in &sites {
                    for original in &inputs {
                        variants.push(splice(form, pos, pos + out_len, original));
                    }
                }
                if sites.len() > 1 {
                    for original in &inputs {
                        let mut restored = form.to_vec();
                        for &pos in sites.iter().rev() {
                            restored = splice(&restored, pos, pos + out_len, original);
                        }
                        variants.push(restored);
                    }
                }
            }
        }
        CompiledPhonRuleKind::Metathesis {
            left,
            left_switch,
            right_switch,
            right,
        } => {
            let (a, b) = (left_switch.len(), right_switch.len());
            for pos in 0..form.len() {
                let end = pos + a + b;
                if matches_at(right_switch, form, pos, classes)
                    && matches_at(left_switch, form, pos + b, classes)
                    && left.matches_left(form, pos, classes)
                    && right.matches_right(form, end, classes)
                {
                    let mut swapped = form[pos + b..end].to_vec();
                    swapped.extend_from_slice(&form[pos..pos + b]);
                    variants.push(splice(form, pos, end, &swapped));
                }
            }
        }
    }
    variants.retain(|v| !v.is_empty() && v.as_slice() != form);
    variants
}

/// Candidate underlying forms of `surface`, the surface form itself first
///
/// Fails when more than `limit` forms would be produced.
pub fn unapply_all(grammar: &CompiledGrammar, surface: &[SegId], limit: usize) -> Result<Vec<Shape>, String> {
    let mut forms = vec![surface.to_vec()];
    for rule in grammar.phon_rules.iter().rev() {
        let mut next = forms.clone();
        for form in &forms {
            for variant in unapply_rule(grammar, rule, form) {
                if !next.contains(&variant) {
                    next.push(variant);
                    if next.len() > limit {
                        return Err(format!("phonological unapplication exceeded {limit} forms"));
                    }
                }
            }
        }
        forms = next;
    }
    Ok(forms)
}
