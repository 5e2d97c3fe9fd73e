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

//! Lexical entries, their forms, senses and morphosyntactic analyses

use super::phonology::FeatureSpec;
use crate::ids::{AllomorphId, EntryId, InflClassId, InflTypeId, MprFeatureId, MsaId, PosId, SenseId, SlotId};
use serde::{Deserialize, Serialize};

/// Morph type of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphType {
    Root,
    BoundRoot,
    Stem,
    BoundStem,
    Particle,
    Phrase,
    Clitic,
    Proclitic,
    Enclitic,
    Prefix,
    Suffix,
    Infix,
    Circumfix,
    PrefixingInterfix,
    SuffixingInterfix,
    InfixingInterfix,
    Simulfix,
    Suprafix,
}

impl MorphType {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::BoundRoot | Self::BoundStem)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allomorph {
    pub id: AllomorphId,
    pub entry: EntryId,
    pub form: String,
    pub morph_type: MorphType,
    pub is_abstract: bool,
    /// Phonological environments in `/ left _ right` notation
    pub environments: Vec<String>,
    /// Inflection classes an affix allomorph is restricted to; empty means any
    pub infl_classes: Vec<InflClassId>,
}

/// Link from an irregularly inflected or spelling variant to its main entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantOf {
    pub main: EntryId,
    pub infl_type: Option<InflTypeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexEntry {
    pub id: EntryId,
    pub citation: String,
    /// Lexeme form first, alternate forms after it
    pub forms: Vec<AllomorphId>,
    pub msas: Vec<MsaId>,
    pub senses: Vec<SenseId>,
    pub variant_of: Option<VariantOf>,
    pub exception_features: Vec<MprFeatureId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexSense {
    pub id: SenseId,
    pub entry: EntryId,
    pub gloss: String,
    pub msa: Option<MsaId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MsaKind {
    Stem {
        pos: Option<PosId>,
        infl_class: Option<InflClassId>,
        features: Vec<FeatureSpec>,
    },
    InflAffix {
        pos: Option<PosId>,
        slots: Vec<SlotId>,
        features: Vec<FeatureSpec>,
    },
    DerivAffix {
        from_pos: Option<PosId>,
        to_pos: Option<PosId>,
        from_infl_class: Option<InflClassId>,
        to_infl_class: Option<InflClassId>,
        from_features: Vec<FeatureSpec>,
        to_features: Vec<FeatureSpec>,
    },
    UnclassifiedAffix {
        pos: Option<PosId>,
    },
}

impl MsaKind {
    pub fn is_stem(&self) -> bool {
        matches!(self, Self::Stem { .. })
    }
}

/// Morphosyntactic analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msa {
    pub id: MsaId,
    pub entry: EntryId,
    pub kind: MsaKind,
}
