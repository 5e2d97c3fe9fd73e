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

//! Phonological records: feature systems, phonemes, natural classes and rules

use crate::ids::{BoundaryId, FeatureId, MprFeatureId, NaturalClassId, PhonRuleId, PhonemeId, PosId};
use serde::{Deserialize, Serialize};

/// Which feature system a definition belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureDomain {
    Syntactic,
    Phonetic,
}

/// A closed feature with symbolic values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefn {
    pub id: FeatureId,
    pub name: String,
    pub domain: FeatureDomain,
    pub values: Vec<String>,
}

/// One feature/value pair as written on a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub feature: FeatureId,
    pub value: String,
}

impl FeatureSpec {
    pub fn new(feature: FeatureId, value: impl Into<String>) -> Self {
        Self { feature, value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phoneme {
    pub id: PhonemeId,
    pub name: String,
    /// Graphemic representations; the first one is used for display
    pub codes: Vec<String>,
    pub features: Vec<FeatureSpec>,
}

/// Morpheme or word boundary symbol such as `+` or `#`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryMarker {
    pub id: BoundaryId,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMembers {
    Segments(Vec<PhonemeId>),
    Features(Vec<FeatureSpec>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalClass {
    pub id: NaturalClassId,
    pub abbreviation: String,
    pub members: ClassMembers,
}

/// Output and context of one rewrite subrule
///
/// Context strings use the environment notation without the leading `/`
/// and `_`, e.g. `left: "[V]"`, `right: "#"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteSubrule {
    pub output: String,
    pub left: String,
    pub right: String,
    /// Parts of speech the subrule is restricted to; empty means any
    pub required_pos: Vec<PosId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhonRuleKind {
    Rewrite { input: String, subrules: Vec<RewriteSubrule> },
    Metathesis { left: String, left_switch: String, right_switch: String, right: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonRule {
    pub id: PhonRuleId,
    pub name: String,
    /// Declared application order; lower applies first
    pub order: u32,
    pub disabled: bool,
    pub kind: PhonRuleKind,
    pub required_mpr: Vec<MprFeatureId>,
    pub excluded_mpr: Vec<MprFeatureId>,
}
