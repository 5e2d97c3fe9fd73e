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

//! Grammatical categories, inflection machinery and exception features

use super::phonology::FeatureSpec;
use crate::ids::{AllomorphId, EntryId, InflClassId, InflTypeId, MprFeatureId, MprGroupId, PosId, ProhibitionId, SlotId, TemplateId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartOfSpeech {
    pub id: PosId,
    pub abbreviation: String,
    pub name: String,
    pub parent: Option<PosId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflectionClass {
    pub id: InflClassId,
    pub pos: PosId,
    pub abbreviation: String,
    pub parent: Option<InflClassId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffixSlot {
    pub id: SlotId,
    pub pos: PosId,
    pub name: String,
    pub optional: bool,
}

/// Ordered slots around a stem; both lists are in surface (left to right) order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffixTemplate {
    pub id: TemplateId,
    pub pos: PosId,
    pub name: String,
    pub prefix_slots: Vec<SlotId>,
    pub suffix_slots: Vec<SlotId>,
    pub disabled: bool,
}

/// Inflection carried by an irregularly inflected variant form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflectionType {
    pub id: InflTypeId,
    pub name: String,
    pub features: Vec<FeatureSpec>,
    /// Slots the variant satisfies without overt affixes
    pub null_slots: Vec<SlotId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MprGroup {
    pub id: MprGroupId,
    pub name: String,
    /// When set every required feature of the group must be present, otherwise any one suffices
    pub match_all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MprFeature {
    pub id: MprFeatureId,
    pub name: String,
    pub group: Option<MprGroupId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjacency {
    Anywhere,
    SomewhereToLeft,
    SomewhereToRight,
    AdjacentToLeft,
    AdjacentToRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProhibitionTarget {
    Allomorphs { first: AllomorphId, others: Vec<AllomorphId> },
    Morphemes { first: EntryId, others: Vec<EntryId> },
}

/// Ad-hoc co-occurrence prohibition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prohibition {
    pub id: ProhibitionId,
    pub target: ProhibitionTarget,
    pub adjacency: Adjacency,
    pub disabled: bool,
}
