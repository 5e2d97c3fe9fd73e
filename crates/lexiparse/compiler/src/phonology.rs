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

//! Phonological rules in application order

use crate::compiler::BuildContext;
use crate::environment::{EnvItem, Edge, Side};
use crate::error::{CompileError, CompileErrorSink};
use crate::grammar::{CompiledPhonRule, CompiledPhonRuleKind, CompiledSubrule};
use crate::symbols::Shape;
use lexidb_core::{PhonRule, PhonRuleKind};
use unicode_normalization::UnicodeNormalization;

/// Compile enabled rules sorted by declared order, then by id
pub(crate) fn build_phon_rules(ctx: &BuildContext<'_>, sink: &mut dyn CompileErrorSink) -> Vec<CompiledPhonRule> {
    let mut sources: Vec<&PhonRule> = ctx.model.phon_rules.values().filter(|r| !r.disabled).collect();
    sources.sort_by_key(|r| (r.order, r.id));
    sources.into_iter().filter_map(|rule| build_rule(ctx, rule).map_err(|err| sink.report(err)).ok()).collect()
}

fn build_rule(ctx: &BuildContext<'_>, rule: &PhonRule) -> Result<CompiledPhonRule, CompileError> {
    let kind = match &rule.kind {
        PhonRuleKind::Rewrite { input, subrules } => {
            let input = sequence(ctx, rule, input)?;
            if subrules.is_empty() {
                return Err(CompileError::invalid_rule(rule.id, "rewrite rule without subrules"));
            }
            let mut compiled = Vec::with_capacity(subrules.len());
            for subrule in subrules {
                let text: String = subrule.output.nfd().collect();
                let output: Shape = ctx.symbols.tokenize(text.trim()).map_err(|at| CompileError::invalid_shape(rule.id, subrule.output.as_str(), at))?;
                if input.is_empty() && output.is_empty() {
                    return Err(CompileError::invalid_rule(rule.id, "rule neither consumes nor produces segments"));
                }
                compiled.push(CompiledSubrule {
                    output,
                    left: side(ctx, rule, &subrule.left, Edge::Left)?,
                    right: side(ctx, rule, &subrule.right, Edge::Right)?,
                    required_pos: subrule.required_pos.clone(),
                });
            }
            CompiledPhonRuleKind::Rewrite { input, subrules: compiled }
        }
        PhonRuleKind::Metathesis {
            left,
            left_switch,
            right_switch,
            right,
        } => {
            let left_switch = sequence(ctx, rule, left_switch)?;
            let right_switch = sequence(ctx, rule, right_switch)?;
            if left_switch.is_empty() || right_switch.is_empty() {
                return Err(CompileError::invalid_rule(rule.id, "metathesis needs both switch positions"));
            }
            CompiledPhonRuleKind::Metathesis {
                left: side(ctx, rule, left, Edge::Left)?,
                left_switch,
                right_switch,
                right: side(ctx, rule, right, Edge::Right)?,
            }
        }
    };
    Ok(CompiledPhonRule {
        source: rule.id,
        name: rule.name.clone(),
        order: rule.order,
        kind,
        required_mpr: rule.required_mpr.clone(),
        excluded_mpr: rule.excluded_mpr.clone(),
    })
}

fn side(ctx: &BuildContext<'_>, rule: &PhonRule, text: &str, edge: Edge) -> Result<Side, CompileError> {
    ctx.env_parser()
        .parse_side(text, edge)
        .map_err(|err| CompileError::invalid_environment(rule.id, text, err.offset, err.reason))
}

/// Segment and class sequence without optional groups or boundaries
fn sequence(ctx: &BuildContext<'_>, rule: &PhonRule, text: &str) -> Result<Vec<EnvItem>, CompileError> {
    let parsed = side(ctx, rule, text, Edge::Inner)?;
    if let Some(offset) = parsed.items.iter().position(|item| matches!(item, EnvItem::Optional(_))) {
        return Err(CompileError::invalid_environment(rule.id, text, offset, "optional groups are not allowed here"));
    }
    Ok(parsed.items)
}
