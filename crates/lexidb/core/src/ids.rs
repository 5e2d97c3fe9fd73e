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

//! Stable object identifiers
//!
//! Every record in a [`LexiconStore`](crate::LexiconStore) is addressed by an
//! [`ObjectId`] drawn from a single monotonically increasing space. The typed
//! wrappers below keep references between records from mixing kinds while
//! still converting losslessly to the untyped id for validity checks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Untyped stable key of a store object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! typed_ids {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub ObjectId);

            impl From<$name> for ObjectId {
                fn from(id: $name) -> Self {
                    id.0
                }
            }

            impl From<ObjectId> for $name {
                fn from(id: ObjectId) -> Self {
                    Self(id)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}{}", stringify!($name), self.0)
                }
            }
        )*
    };
}

typed_ids! {
    /// Syntactic or phonetic feature definition
    FeatureId,
    PhonemeId,
    BoundaryId,
    NaturalClassId,
    PhonRuleId,
    /// Part of speech (grammatical category)
    PosId,
    InflClassId,
    SlotId,
    TemplateId,
    /// Lexical entry
    EntryId,
    /// One form (allomorph) of a lexical entry
    AllomorphId,
    SenseId,
    /// Morphosyntactic analysis of an entry; the "rule/entry reference" of an analysis segment
    MsaId,
    /// Inflection type of an irregularly inflected variant
    InflTypeId,
    /// Exception ("MPR") feature
    MprFeatureId,
    MprGroupId,
    ProhibitionId,
    WordformId,
    AnalysisId,
    ProblemId,
    TextRefId,
}

/// Kind tag registered for every live object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    FeatureDefn,
    Phoneme,
    BoundaryMarker,
    NaturalClass,
    PhonRule,
    PartOfSpeech,
    InflectionClass,
    AffixSlot,
    AffixTemplate,
    LexEntry,
    Allomorph,
    LexSense,
    Msa,
    InflectionType,
    MprFeature,
    MprGroup,
    Prohibition,
    Wordform,
    StoredAnalysis,
    ProblemMarker,
    TextReference,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
