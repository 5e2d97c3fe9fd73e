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

//! Affix processes, reduplication, templates and null affixes

use crate::compiler::BuildContext;
use crate::error::{CompileError, CompileErrorSink};
use crate::features::FeatureStruct;
use crate::grammar::{AffixKind, CompiledSlot, CompiledTemplate, LexicalEntry, LhsPart, MorphRule, NullAffix, ProcessAllomorph, RhsPart, RuleAllomorph, RuleRole};
use crate::lexicon::{parse_environments, tokenize_form};
use crate::symbols::Shape;
use lexidb_core::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Bracketed class reference in a reduplication pattern, e.g. `[C]` or `[V^2]`
pub(crate) const REDUPLICATION_PATTERN: &str = r"\[([^\[\]\^]+)(?:\^(\d+))?\]";

/// Process allomorphs for one affix or clitic form
///
/// Infixes yield one allomorph per position environment; every other kind
/// yields at most one. Items that fail to build are reported and omitted.
pub(crate) fn affix_allomorphs(ctx: &BuildContext<'_>, allomorph: &Allomorph, kind: AffixKind, sink: &mut dyn CompileErrorSink) -> Vec<RuleAllomorph> {
    let owner = allomorph.id;
    let raw = allomorph.form.as_str();
    let is_marker = |c: char| c == '-' || c.is_whitespace();
    let leading = raw.len() - raw.trim_start_matches(is_marker).len();
    let text = raw.trim_matches(is_marker);
    if text.is_empty() {
        return Vec::new();
    }
    let redup = text.contains(['[', ']']);

    let build = |process: ProcessAllomorph, environments| RuleAllomorph {
        source: owner,
        process,
        environments,
        infl_classes: allomorph.infl_classes.clone(),
    };

    match kind {
        AffixKind::Infix | AffixKind::Circumfix if redup => {
            sink.report(CompileError::invalid_reduplication(owner, raw, "reduplication is only supported on prefixes and suffixes"));
            Vec::new()
        }
        AffixKind::Infix => {
            let Some(shape) = tokenize_form(ctx, owner, raw, text, leading, sink) else {
                return Vec::new();
            };
            if allomorph.environments.is_empty() {
                sink.report(CompileError::invalid_rule(owner, "infix has no position environment"));
                return Vec::new();
            }
            let Some(positions) = parse_environments(ctx, owner, &allomorph.environments, sink) else {
                return Vec::new();
            };
            if shape.is_empty() {
                return Vec::new();
            }
            positions.into_iter().map(|env| build(ProcessAllomorph::infix(shape.clone(), env), Vec::new())).collect()
        }
        AffixKind::Circumfix => {
            let Some(split) = text.find("...") else {
                sink.report(CompileError::invalid_shape(owner, raw, leading + text.len()));
                return Vec::new();
            };
            let before = tokenize_form(ctx, owner, raw, &text[..split], leading, sink);
            let after = tokenize_form(ctx, owner, raw, &text[split + 3..], leading + split + 3, sink);
            let (Some(before), Some(after)) = (before, after) else {
                return Vec::new();
            };
            let Some(environments) = parse_environments(ctx, owner, &allomorph.environments, sink) else {
                return Vec::new();
            };
            vec![build(ProcessAllomorph::circumfix(before, after), environments)]
        }
        _ => {
            let prefixal = kind.is_prefixal();
            let process = if redup {
                reduplication(ctx, owner, raw, text, leading, prefixal, sink)
            } else {
                tokenize_form(ctx, owner, raw, text, leading, sink)
                    .filter(|shape| !shape.is_empty())
                    .map(|shape| if prefixal { ProcessAllomorph::prefix(shape) } else { ProcessAllomorph::suffix(shape) })
            };
            let Some(process) = process else {
                return Vec::new();
            };
            let Some(environments) = parse_environments(ctx, owner, &allomorph.environments, sink) else {
                return Vec::new();
            };
            vec![build(process, environments)]
        }
    }
}

enum RedupItem {
    Literal(Shape),
    /// Index into the distinct class references
    Class(usize),
}

/// Build a reduplicating prefix or suffix
///
/// Class references copy segments from the edge of the stem the affix attaches
/// to. Repeated references to the same class (and index) copy the same segment.
fn reduplication(ctx: &BuildContext<'_>, owner: AllomorphId, form: &str, text: &str, leading: usize, prefixal: bool, sink: &mut dyn CompileErrorSink) -> Option<ProcessAllomorph> {
    let Some(pattern) = ctx.reduplication else {
        sink.report(CompileError::invalid_reduplication(owner, form, "reduplication pattern unavailable"));
        return None;
    };

    let mut items = Vec::new();
    let mut keys: Vec<(usize, Option<u32>)> = Vec::new();
    let mut last = 0;
    let literal = |items: &mut Vec<RedupItem>, start: usize, end: usize, sink: &mut dyn CompileErrorSink| -> Option<()> {
        let piece = &text[start..end];
        if piece.contains(['[', ']']) {
            sink.report(CompileError::invalid_reduplication(owner, form, format!("unbalanced brackets at offset {}", leading + start)));
            return None;
        }
        if !piece.is_empty() {
            let shape = tokenize_form(ctx, owner, form, piece, leading + start, sink)?;
            if !shape.is_empty() {
                items.push(RedupItem::Literal(shape));
            }
        }
        Some(())
    };

    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        literal(&mut items, last, whole.start(), &mut *sink)?;
        let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let Some(class) = ctx.class_names.get(name).copied() else {
            sink.report(CompileError::invalid_reduplication(owner, form, format!("unknown natural class '{name}'")));
            return None;
        };
        let index = match caps.get(2) {
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    sink.report(CompileError::invalid_reduplication(owner, form, format!("bad index '{}'", m.as_str())));
                    return None;
                }
            },
            None => None,
        };
        let key = (class, index);
        let position = match keys.iter().position(|k| *k == key) {
            Some(position) => position,
            None => {
                keys.push(key);
                keys.len() - 1
            }
        };
        items.push(RedupItem::Class(position));
        last = whole.end();
    }
    literal(&mut items, last, text.len(), &mut *sink)?;

    if keys.is_empty() {
        sink.report(CompileError::invalid_reduplication(owner, form, "no class reference"));
        return None;
    }

    let classes = keys.iter().map(|(class, _)| LhsPart::Class(*class));
    let (lhs, class_offset, any): (Vec<LhsPart>, usize, usize) = if prefixal {
        (classes.chain([LhsPart::Any]).collect(), 0, keys.len())
    } else {
        ([LhsPart::Any].into_iter().chain(classes).collect(), 1, 0)
    };
    let copied: Vec<RhsPart> = items
        .into_iter()
        .map(|item| match item {
            RedupItem::Literal(shape) => RhsPart::Insert(shape),
            RedupItem::Class(k) => RhsPart::Copy(k + class_offset),
        })
        .collect();
    let input = (0..lhs.len()).map(RhsPart::Copy);
    let rhs = if prefixal { copied.into_iter().chain(input).collect() } else { input.chain(copied).collect() };
    debug!(allomorph = %owner, any, "reduplication compiled");
    Some(ProcessAllomorph { lhs, rhs, split: None })
}

/// Null affix rules for every slot an irregularly inflected variant satisfies
pub(crate) fn build_null_affixes(ctx: &BuildContext<'_>, lexicon: &[LexicalEntry], sink: &mut dyn CompileErrorSink) -> Vec<NullAffix> {
    let used: BTreeSet<InflTypeId> = lexicon.iter().filter_map(|e| e.infl_type).collect();
    let mut nulls = Vec::new();
    for infl_type in used {
        let Some(defn) = ctx.model.infl_types.get(&infl_type) else { continue };
        let Ok(features) = FeatureStruct::from_specs(&defn.features, ctx.model, infl_type) else {
            continue;
        };
        for slot in &defn.null_slots {
            if !ctx.model.slots.contains_key(slot) {
                sink.report(CompileError::DanglingReference {
                    owner: infl_type.into(),
                    target: (*slot).into(),
                });
                continue;
            }
            nulls.push(NullAffix {
                slot: *slot,
                infl_type,
                features: features.clone(),
            });
        }
    }
    nulls
}

/// Affix templates with only the slots some rule or null affix can fill
pub(crate) fn build_templates(ctx: &BuildContext<'_>, rules: &[MorphRule], nulls: &[NullAffix], sink: &mut dyn CompileErrorSink) -> Vec<CompiledTemplate> {
    let mut templates = Vec::new();
    for template in ctx.model.templates.values().filter(|t| !t.disabled) {
        if !ctx.model.parts_of_speech.contains_key(&template.pos) {
            sink.report(CompileError::DanglingReference {
                owner: template.id.into(),
                target: template.pos.into(),
            });
            continue;
        }
        let slots = |ids: &[SlotId], sink: &mut dyn CompileErrorSink| -> Vec<CompiledSlot> {
            ids.iter()
                .filter_map(|id| {
                    let Some(slot) = ctx.model.slots.get(id) else {
                        sink.report(CompileError::DanglingReference {
                            owner: template.id.into(),
                            target: (*id).into(),
                        });
                        return None;
                    };
                    let compiled = CompiledSlot {
                        slot: *id,
                        name: slot.name.clone(),
                        optional: slot.optional,
                        rules: rules
                            .iter()
                            .enumerate()
                            .filter(|(_, r)| matches!(&r.role, RuleRole::Inflectional { slots, .. } if slots.contains(id)))
                            .map(|(i, _)| i)
                            .collect(),
                        null_for: nulls.iter().filter(|n| n.slot == *id).map(|n| n.infl_type).collect(),
                    };
                    if compiled.rules.is_empty() && compiled.null_for.is_empty() {
                        debug!(template = %template.name, slot = %slot.name, "slot has no applicable rules; skipped");
                        return None;
                    }
                    Some(compiled)
                })
                .collect()
        };
        let prefix_slots = slots(&template.prefix_slots, &mut *sink);
        let suffix_slots = slots(&template.suffix_slots, &mut *sink);
        templates.push(CompiledTemplate {
            source: template.id,
            pos: template.pos,
            name: template.name.clone(),
            prefix_slots,
            suffix_slots,
        });
    }
    templates
}
