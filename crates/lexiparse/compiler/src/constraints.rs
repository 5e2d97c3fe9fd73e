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

//! Co-occurrence constraints

use crate::compiler::BuildContext;
use crate::error::{CompileError, CompileErrorSink};
use crate::grammar::CoOccurrence;
use lexidb_core::{AllomorphId, EntryId, Prohibition, ProhibitionTarget};

/// Expand every enabled prohibition into pairwise allomorph constraints
///
/// Morpheme-level prohibitions are expanded over the Cartesian product of the
/// allomorphs of the key morpheme and of each other morpheme.
pub(crate) fn build_co_occurrences(ctx: &BuildContext<'_>, sink: &mut dyn CompileErrorSink) -> Vec<CoOccurrence> {
    let mut constraints = Vec::new();
    for prohibition in ctx.model.prohibitions.values().filter(|p| !p.disabled) {
        let (keys, others) = match &prohibition.target {
            ProhibitionTarget::Allomorphs { first, others } => {
                let keys = allomorphs(ctx, prohibition, std::slice::from_ref(first), sink);
                (keys, allomorphs(ctx, prohibition, others, sink))
            }
            ProhibitionTarget::Morphemes { first, others } => {
                let keys = entry_allomorphs(ctx, prohibition, std::slice::from_ref(first), sink);
                (keys, entry_allomorphs(ctx, prohibition, others, sink))
            }
        };
        for key in &keys {
            for other in &others {
                constraints.push(CoOccurrence {
                    source: prohibition.id,
                    key: *key,
                    other: *other,
                    adjacency: prohibition.adjacency,
                });
            }
        }
    }
    constraints
}

fn allomorphs(ctx: &BuildContext<'_>, prohibition: &Prohibition, ids: &[AllomorphId], sink: &mut dyn CompileErrorSink) -> Vec<AllomorphId> {
    ids.iter()
        .copied()
        .filter(|id| {
            let known = ctx.model.allomorphs.contains_key(id);
            if !known {
                sink.report(CompileError::DanglingReference {
                    owner: prohibition.id.into(),
                    target: (*id).into(),
                });
            }
            known
        })
        .collect()
}

fn entry_allomorphs(ctx: &BuildContext<'_>, prohibition: &Prohibition, ids: &[EntryId], sink: &mut dyn CompileErrorSink) -> Vec<AllomorphId> {
    let mut forms = Vec::new();
    for id in ids {
        match ctx.model.entries.get(id) {
            Some(entry) => forms.extend(entry.forms.iter().copied()),
            None => sink.report(CompileError::DanglingReference {
                owner: prohibition.id.into(),
                target: (*id).into(),
            }),
        }
    }
    forms
}
