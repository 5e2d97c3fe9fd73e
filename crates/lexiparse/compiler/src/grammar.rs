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

//! The compiled grammar
//!
//! A [`CompiledGrammar`] is built once per rebuild and never mutated. Every
//! lexical entry and rule keeps the ids of the store records it came from so
//! analyses can be resolved back to the source model.

use crate::environment::{EnvItem, Environment, Side};
use crate::features::FeatureStruct;
use crate::symbols::{SegId, Shape, SymbolTable};
use lexidb_core::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub type LexIndex = usize;
pub type RuleIndex = usize;

#[derive(Debug, Clone, Serialize)]
pub struct CompiledClass {
    pub source: NaturalClassId,
    pub abbreviation: String,
    pub members: BTreeSet<SegId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StemAllomorph {
    pub source: AllomorphId,
    pub shape: Shape,
    pub environments: Vec<Environment>,
    /// Bound roots and stems need at least one affix
    pub bound: bool,
}

/// Stem-like lexicon entry, one per (entry, stem MSA)
#[derive(Debug, Clone, Serialize)]
pub struct LexicalEntry {
    pub entry: EntryId,
    pub msa: MsaId,
    /// Set for irregularly inflected variants
    pub infl_type: Option<InflTypeId>,
    pub pos: Option<PosId>,
    pub infl_class: Option<InflClassId>,
    pub features: FeatureStruct,
    pub exception_features: Vec<MprFeatureId>,
    pub allomorphs: Vec<StemAllomorph>,
    pub gloss: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AffixKind {
    Prefix,
    Suffix,
    Infix,
    Circumfix,
    Proclitic,
    Enclitic,
}

impl AffixKind {
    /// Affix material sits before the stem
    pub fn is_prefixal(&self) -> bool {
        matches!(self, Self::Prefix | Self::Proclitic)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum RuleRole {
    Inflectional {
        pos: Option<PosId>,
        slots: Vec<SlotId>,
        features: FeatureStruct,
    },
    Derivational {
        from_pos: Option<PosId>,
        to_pos: Option<PosId>,
        from_infl_class: Option<InflClassId>,
        to_infl_class: Option<InflClassId>,
        from_features: FeatureStruct,
        to_features: FeatureStruct,
    },
    Unclassified {
        pos: Option<PosId>,
    },
    Clitic,
}

/// Left-hand side element of a process allomorph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LhsPart {
    /// Any non-empty stretch of the input
    Any,
    /// Exactly one segment of a natural class
    Class(usize),
}

/// Right-hand side element of a process allomorph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RhsPart {
    Copy(usize),
    Insert(Shape),
}

/// Affixation as a rewrite of the input matched by `lhs` into `rhs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessAllomorph {
    pub lhs: Vec<LhsPart>,
    pub rhs: Vec<RhsPart>,
    /// For infixes: where the input is split
    pub split: Option<Environment>,
}

impl ProcessAllomorph {
    pub fn prefix(shape: Shape) -> Self {
        Self {
            lhs: vec![LhsPart::Any],
            rhs: vec![RhsPart::Insert(shape), RhsPart::Copy(0)],
            split: None,
        }
    }

    pub fn suffix(shape: Shape) -> Self {
        Self {
            lhs: vec![LhsPart::Any],
            rhs: vec![RhsPart::Copy(0), RhsPart::Insert(shape)],
            split: None,
        }
    }

    pub fn circumfix(before: Shape, after: Shape) -> Self {
        Self {
            lhs: vec![LhsPart::Any],
            rhs: vec![RhsPart::Insert(before), RhsPart::Copy(0), RhsPart::Insert(after)],
            split: None,
        }
    }

    pub fn infix(shape: Shape, position: Environment) -> Self {
        Self {
            lhs: vec![LhsPart::Any, LhsPart::Any],
            rhs: vec![RhsPart::Copy(0), RhsPart::Insert(shape), RhsPart::Copy(1)],
            split: Some(position),
        }
    }

    /// Literal material this allomorph adds, when it is a plain prefix or suffix
    pub fn concatenative(&self) -> Option<(bool, &Shape)> {
        match (self.lhs.as_slice(), self.rhs.as_slice()) {
            ([LhsPart::Any], [RhsPart::Insert(shape), RhsPart::Copy(0)]) => Some((true, shape)),
            ([LhsPart::Any], [RhsPart::Copy(0), RhsPart::Insert(shape)]) => Some((false, shape)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleAllomorph {
    pub source: AllomorphId,
    pub process: ProcessAllomorph,
    /// Conditioning environments; empty means unrestricted
    pub environments: Vec<Environment>,
    pub infl_classes: Vec<InflClassId>,
}

/// Affixal or clitic morphological rule, one per (entry, MSA)
#[derive(Debug, Clone, Serialize)]
pub struct MorphRule {
    pub entry: EntryId,
    pub msa: MsaId,
    pub kind: AffixKind,
    pub role: RuleRole,
    pub allomorphs: Vec<RuleAllomorph>,
    pub exception_features: Vec<MprFeatureId>,
    pub gloss: String,
}

impl MorphRule {
    pub fn is_inflectional(&self) -> bool {
        matches!(self.role, RuleRole::Inflectional { .. })
    }
}

/// Rule satisfying a slot for an irregularly inflected variant without surface material
#[derive(Debug, Clone, Serialize)]
pub struct NullAffix {
    pub slot: SlotId,
    pub infl_type: InflTypeId,
    pub features: FeatureStruct,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledSlot {
    pub slot: SlotId,
    pub name: String,
    pub optional: bool,
    pub rules: Vec<RuleIndex>,
    /// Inflection types with a null affix in this slot
    pub null_for: Vec<InflTypeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledTemplate {
    pub source: TemplateId,
    pub pos: PosId,
    pub name: String,
    /// Surface order, leftmost first
    pub prefix_slots: Vec<CompiledSlot>,
    /// Surface order, leftmost first
    pub suffix_slots: Vec<CompiledSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledSubrule {
    pub output: Shape,
    pub left: Side,
    pub right: Side,
    pub required_pos: Vec<PosId>,
}

#[derive(Debug, Clone, Serialize)]
pub enum CompiledPhonRuleKind {
    Rewrite {
        input: Vec<EnvItem>,
        subrules: Vec<CompiledSubrule>,
    },
    Metathesis {
        left: Side,
        left_switch: Vec<EnvItem>,
        right_switch: Vec<EnvItem>,
        right: Side,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledPhonRule {
    pub source: PhonRuleId,
    pub name: String,
    pub order: u32,
    pub kind: CompiledPhonRuleKind,
    pub required_mpr: Vec<MprFeatureId>,
    pub excluded_mpr: Vec<MprFeatureId>,
}

/// Pairwise co-occurrence constraint expanded from a prohibition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoOccurrence {
    pub source: ProhibitionId,
    pub key: AllomorphId,
    pub other: AllomorphId,
    pub adjacency: Adjacency,
}

/// Counts describing a compiled grammar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrammarSummary {
    pub model_version: u64,
    pub segments: usize,
    pub natural_classes: usize,
    pub lexical_entries: usize,
    pub stem_allomorphs: usize,
    pub rules: usize,
    pub rule_allomorphs: usize,
    pub templates: usize,
    pub null_affixes: usize,
    pub phon_rules: usize,
    pub co_occurrences: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledGrammar {
    pub model_version: u64,
    pub symbols: SymbolTable,
    pub classes: Vec<CompiledClass>,
    pub lexicon: Vec<LexicalEntry>,
    pub rules: Vec<MorphRule>,
    pub templates: Vec<CompiledTemplate>,
    pub null_affixes: Vec<NullAffix>,
    /// Application order
    pub phon_rules: Vec<CompiledPhonRule>,
    pub co_occurrences: Vec<CoOccurrence>,
    pub(crate) pos_parents: HashMap<PosId, Option<PosId>>,
    pub(crate) infl_class_parents: HashMap<InflClassId, Option<InflClassId>>,
    pub(crate) mpr_groups: HashMap<MprFeatureId, (Option<MprGroupId>, bool)>,
    pub(crate) slot_optional: HashMap<SlotId, bool>,
    pub(crate) shape_index: HashMap<Shape, Vec<(LexIndex, usize)>>,
}

impl CompiledGrammar {
    /// Stem allomorphs with exactly this shape, as (entry, allomorph) indexes
    pub fn lookup(&self, shape: &[SegId]) -> &[(LexIndex, usize)] {
        self.shape_index.get(shape).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pos_descends_from(&self, pos: PosId, ancestor: PosId) -> bool {
        descends(&self.pos_parents, pos, ancestor)
    }

    pub fn infl_class_descends_from(&self, class: InflClassId, ancestor: InflClassId) -> bool {
        descends(&self.infl_class_parents, class, ancestor)
    }

    /// Whether a word carrying `present` exception features satisfies a rule's requirements
    pub fn mpr_satisfied(&self, required: &[MprFeatureId], excluded: &[MprFeatureId], present: &BTreeSet<MprFeatureId>) -> bool {
        if excluded.iter().any(|f| present.contains(f)) {
            return false;
        }
        let mut groups: HashMap<Option<MprGroupId>, (bool, Vec<bool>)> = HashMap::new();
        for feature in required {
            let (group, match_all) = self.mpr_groups.get(feature).copied().unwrap_or((None, true));
            let entry = groups.entry(group).or_insert((match_all, Vec::new()));
            entry.1.push(present.contains(feature));
        }
        groups.into_iter().all(|(group, (match_all, hits))| {
            if group.is_none() || match_all { hits.iter().all(|h| *h) } else { hits.iter().any(|h| *h) }
        })
    }

    pub fn slot_is_optional(&self, slot: SlotId) -> bool {
        self.slot_optional.get(&slot).copied().unwrap_or(false)
    }

    pub fn summary(&self) -> GrammarSummary {
        GrammarSummary {
            model_version: self.model_version,
            segments: self.symbols.len(),
            natural_classes: self.classes.len(),
            lexical_entries: self.lexicon.len(),
            stem_allomorphs: self.lexicon.iter().map(|e| e.allomorphs.len()).sum(),
            rules: self.rules.len(),
            rule_allomorphs: self.rules.iter().map(|r| r.allomorphs.len()).sum(),
            templates: self.templates.len(),
            null_affixes: self.null_affixes.len(),
            phon_rules: self.phon_rules.len(),
            co_occurrences: self.co_occurrences.len(),
        }
    }

    pub(crate) fn index_lexicon(&mut self) {
        self.shape_index.clear();
        for (lex, entry) in self.lexicon.iter().enumerate() {
            for (allo, allomorph) in entry.allomorphs.iter().enumerate() {
                self.shape_index.entry(allomorph.shape.clone()).or_default().push((lex, allo));
            }
        }
    }
}

fn descends<T: Copy + Eq + std::hash::Hash>(parents: &HashMap<T, Option<T>>, node: T, ancestor: T) -> bool {
    let mut current = Some(node);
    for _ in 0..=parents.len() {
        match current {
            Some(id) if id == ancestor => return true,
            Some(id) => current = parents.get(&id).copied().flatten(),
            None => return false,
        }
    }
    false
}
