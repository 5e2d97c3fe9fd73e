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

//! Typed access to the store's tables

use crate::corpus::{Corpus, ProblemMarker, StoredAnalysis, TextReference, Wordform};
use crate::ids::*;
use crate::model::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Backing tables of a store; only reachable through a transaction or view
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) model: Arc<LinguisticModel>,
    pub(crate) corpus: Corpus,
}

/// A record type living in one table of the store
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + Ord + fmt::Debug + Into<ObjectId> + From<ObjectId>;
    const KIND: ObjectKind;

    fn id(&self) -> Self::Id;
    fn table(tables: &Tables) -> &BTreeMap<Self::Id, Self>;
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Id, Self>;
}

macro_rules! model_records {
    ($($ty:ty => $id:ty, $kind:ident, $field:ident;)*) => {
        $(
            impl Record for $ty {
                type Id = $id;
                const KIND: ObjectKind = ObjectKind::$kind;

                fn id(&self) -> Self::Id {
                    self.id
                }

                fn table(tables: &Tables) -> &BTreeMap<Self::Id, Self> {
                    &tables.model.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Id, Self> {
                    &mut Arc::make_mut(&mut tables.model).$field
                }
            }
        )*
    };
}

macro_rules! corpus_records {
    ($($ty:ty => $id:ty, $kind:ident, $field:ident;)*) => {
        $(
            impl Record for $ty {
                type Id = $id;
                const KIND: ObjectKind = ObjectKind::$kind;

                fn id(&self) -> Self::Id {
                    self.id
                }

                fn table(tables: &Tables) -> &BTreeMap<Self::Id, Self> {
                    &tables.corpus.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Id, Self> {
                    &mut tables.corpus.$field
                }
            }
        )*
    };
}

model_records! {
    FeatureDefn => FeatureId, FeatureDefn, features;
    Phoneme => PhonemeId, Phoneme, phonemes;
    BoundaryMarker => BoundaryId, BoundaryMarker, boundaries;
    NaturalClass => NaturalClassId, NaturalClass, natural_classes;
    PhonRule => PhonRuleId, PhonRule, phon_rules;
    PartOfSpeech => PosId, PartOfSpeech, parts_of_speech;
    InflectionClass => InflClassId, InflectionClass, infl_classes;
    AffixSlot => SlotId, AffixSlot, slots;
    AffixTemplate => TemplateId, AffixTemplate, templates;
    LexEntry => EntryId, LexEntry, entries;
    Allomorph => AllomorphId, Allomorph, allomorphs;
    LexSense => SenseId, LexSense, senses;
    Msa => MsaId, Msa, msas;
    InflectionType => InflTypeId, InflectionType, infl_types;
    MprFeature => MprFeatureId, MprFeature, mpr_features;
    MprGroup => MprGroupId, MprGroup, mpr_groups;
    Prohibition => ProhibitionId, Prohibition, prohibitions;
}

corpus_records! {
    Wordform => WordformId, Wordform, wordforms;
    StoredAnalysis => AnalysisId, StoredAnalysis, analyses;
    ProblemMarker => ProblemId, ProblemMarker, problems;
    TextReference => TextRefId, TextReference, text_refs;
}
