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

//! The grammar-relevant part of the store
//!
//! A [`LinguisticModel`] is shared copy-on-write: transactions mutate it through
//! `Arc::make_mut`, so a [`ModelSnapshot`] taken before a mutation keeps seeing
//! the old state for as long as a compile holds it.

pub mod lexicon;
pub mod morphology;
pub mod phonology;

pub use lexicon::{Allomorph, LexEntry, LexSense, MorphType, Msa, MsaKind, VariantOf};
pub use morphology::{AffixSlot, AffixTemplate, Adjacency, InflectionClass, InflectionType, MprFeature, MprGroup, PartOfSpeech, Prohibition, ProhibitionTarget};
pub use phonology::{BoundaryMarker, ClassMembers, FeatureDefn, FeatureDomain, FeatureSpec, NaturalClass, PhonRule, PhonRuleKind, Phoneme, RewriteSubrule};

use crate::ids::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinguisticModel {
    pub features: BTreeMap<FeatureId, FeatureDefn>,
    pub phonemes: BTreeMap<PhonemeId, Phoneme>,
    pub boundaries: BTreeMap<BoundaryId, BoundaryMarker>,
    pub natural_classes: BTreeMap<NaturalClassId, NaturalClass>,
    pub phon_rules: BTreeMap<PhonRuleId, PhonRule>,
    pub parts_of_speech: BTreeMap<PosId, PartOfSpeech>,
    pub infl_classes: BTreeMap<InflClassId, InflectionClass>,
    pub slots: BTreeMap<SlotId, AffixSlot>,
    pub templates: BTreeMap<TemplateId, AffixTemplate>,
    pub entries: BTreeMap<EntryId, LexEntry>,
    pub allomorphs: BTreeMap<AllomorphId, Allomorph>,
    pub senses: BTreeMap<SenseId, LexSense>,
    pub msas: BTreeMap<MsaId, Msa>,
    pub infl_types: BTreeMap<InflTypeId, InflectionType>,
    pub mpr_features: BTreeMap<MprFeatureId, MprFeature>,
    pub mpr_groups: BTreeMap<MprGroupId, MprGroup>,
    pub prohibitions: BTreeMap<ProhibitionId, Prohibition>,
}

impl LinguisticModel {
    /// First gloss recorded for an entry, falling back to its citation form
    pub fn gloss_of(&self, entry: EntryId) -> Option<&str> {
        let entry = self.entries.get(&entry)?;
        entry
            .senses
            .iter()
            .filter_map(|sense| self.senses.get(sense))
            .map(|sense| sense.gloss.as_str())
            .next()
            .or(Some(entry.citation.as_str()))
    }

    /// Whether `pos` equals `ancestor` or descends from it
    pub fn pos_descends_from(&self, pos: PosId, ancestor: PosId) -> bool {
        let mut current = Some(pos);
        let mut guard = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            guard += 1;
            if guard > self.parts_of_speech.len() {
                return false;
            }
            current = self.parts_of_speech.get(&id).and_then(|p| p.parent);
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.phonemes.is_empty()
    }
}

/// Immutable view of the model handed to the compiler
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    model: Arc<LinguisticModel>,
    version: u64,
}

impl ModelSnapshot {
    pub(crate) fn new(model: Arc<LinguisticModel>, version: u64) -> Self {
        Self { model, version }
    }

    /// Store version the snapshot was taken at
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Deref for ModelSnapshot {
    type Target = LinguisticModel;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}
