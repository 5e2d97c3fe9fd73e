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

//! JSON model documents
//!
//! A [`ModelDocument`] describes a model and a word list with symbolic names
//! instead of ids. [`ModelDocument::import`] resolves the names and inserts
//! the records into a store inside one exclusive transaction. The import is
//! not atomic: a resolution error leaves the records inserted so far in place.
//!
//! Allomorph references use `entry` for the first form of an entry and
//! `entry#n` for its n-th form.

use crate::corpus::Wordform;
use crate::error::{StoreError, StoreResult};
use crate::ids::*;
use crate::model::*;
use crate::store::{LexiconStore, Transaction};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelDocument {
    pub features: Vec<FeatureDoc>,
    pub phonemes: Vec<PhonemeDoc>,
    pub boundaries: Vec<BoundaryDoc>,
    pub natural_classes: Vec<NaturalClassDoc>,
    pub mpr_groups: Vec<MprGroupDoc>,
    pub mpr_features: Vec<MprFeatureDoc>,
    pub parts_of_speech: Vec<PosDoc>,
    pub infl_types: Vec<InflTypeDoc>,
    pub entries: Vec<EntryDoc>,
    pub phon_rules: Vec<PhonRuleDoc>,
    pub prohibitions: Vec<ProhibitionDoc>,
    pub wordforms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureDoc {
    pub name: String,
    pub domain: FeatureDomain,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhonemeDoc {
    pub name: String,
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryDoc {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NaturalClassDoc {
    pub abbr: String,
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MprGroupDoc {
    pub name: String,
    #[serde(default = "default_true")]
    pub match_all: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MprFeatureDoc {
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PosDoc {
    pub abbr: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub infl_classes: Vec<InflClassDoc>,
    #[serde(default)]
    pub slots: Vec<SlotDoc>,
    #[serde(default)]
    pub templates: Vec<TemplateDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InflClassDoc {
    pub abbr: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotDoc {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDoc {
    pub name: String,
    #[serde(default)]
    pub prefix_slots: Vec<String>,
    #[serde(default)]
    pub suffix_slots: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InflTypeDoc {
    pub name: String,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
    #[serde(default)]
    pub null_slots: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormDoc {
    pub form: String,
    #[serde(rename = "type")]
    pub morph_type: MorphType,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub infl_classes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MsaDoc {
    Stem {
        #[serde(default)]
        pos: Option<String>,
        #[serde(default)]
        infl_class: Option<String>,
        #[serde(default)]
        features: BTreeMap<String, String>,
    },
    Infl {
        #[serde(default)]
        pos: Option<String>,
        #[serde(default)]
        slots: Vec<String>,
        #[serde(default)]
        features: BTreeMap<String, String>,
    },
    Deriv {
        #[serde(default)]
        from_pos: Option<String>,
        #[serde(default)]
        to_pos: Option<String>,
        #[serde(default)]
        from_infl_class: Option<String>,
        #[serde(default)]
        to_infl_class: Option<String>,
        #[serde(default)]
        from_features: BTreeMap<String, String>,
        #[serde(default)]
        to_features: BTreeMap<String, String>,
    },
    Unclassified {
        #[serde(default)]
        pos: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantDoc {
    pub entry: String,
    #[serde(default)]
    pub infl_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryDoc {
    pub key: String,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub gloss: Option<String>,
    pub forms: Vec<FormDoc>,
    #[serde(default)]
    pub msas: Vec<MsaDoc>,
    #[serde(default)]
    pub variant_of: Option<VariantDoc>,
    #[serde(default)]
    pub exception_features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubruleDoc {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub right: String,
    #[serde(default)]
    pub required_pos: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhonRuleBodyDoc {
    Rewrite {
        input: String,
        subrules: Vec<SubruleDoc>,
    },
    Metathesis {
        #[serde(default)]
        left: String,
        left_switch: String,
        right_switch: String,
        #[serde(default)]
        right: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhonRuleDoc {
    pub name: String,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten)]
    pub body: PhonRuleBodyDoc,
    #[serde(default)]
    pub required_mpr: Vec<String>,
    #[serde(default)]
    pub excluded_mpr: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProhibitionDoc {
    Allomorphs {
        first: String,
        others: Vec<String>,
        #[serde(default = "default_adjacency")]
        adjacency: Adjacency,
    },
    Morphemes {
        first: String,
        others: Vec<String>,
        #[serde(default = "default_adjacency")]
        adjacency: Adjacency,
    },
}

fn default_true() -> bool {
    true
}

fn default_adjacency() -> Adjacency {
    Adjacency::Anywhere
}

/// Name to id maps produced by an import
#[derive(Debug, Clone, Default)]
pub struct ImportedModel {
    pub entries: HashMap<String, EntryId>,
    pub msas: HashMap<String, Vec<MsaId>>,
    pub allomorphs: HashMap<String, Vec<AllomorphId>>,
    pub wordforms: BTreeMap<String, WordformId>,
    pub infl_types: HashMap<String, InflTypeId>,
    pub parts_of_speech: HashMap<String, PosId>,
}

impl ImportedModel {
    pub fn entry(&self, key: &str) -> Option<EntryId> {
        self.entries.get(key).copied()
    }

    pub fn wordform(&self, form: &str) -> Option<WordformId> {
        self.wordforms.get(form).copied()
    }

    /// First MSA of an entry
    pub fn msa(&self, key: &str) -> Option<MsaId> {
        self.msas.get(key).and_then(|m| m.first().copied())
    }

    /// First form of an entry
    pub fn allomorph(&self, key: &str) -> Option<AllomorphId> {
        self.allomorphs.get(key).and_then(|a| a.first().copied())
    }
}

#[derive(Default)]
struct Names {
    features: HashMap<String, FeatureId>,
    phonemes: HashMap<String, PhonemeId>,
    mpr_groups: HashMap<String, MprGroupId>,
    mpr_features: HashMap<String, MprFeatureId>,
    infl_classes: HashMap<String, InflClassId>,
    slots: HashMap<String, SlotId>,
}

fn lookup<T: Copy>(map: &HashMap<String, T>, kind: &'static str, name: &str) -> StoreResult<T> {
    map.get(name).copied().ok_or_else(|| StoreError::unknown(kind, name))
}

fn lookup_opt<T: Copy>(map: &HashMap<String, T>, kind: &'static str, name: &Option<String>) -> StoreResult<Option<T>> {
    name.as_deref().map(|n| lookup(map, kind, n)).transpose()
}

fn lookup_all<T: Copy>(map: &HashMap<String, T>, kind: &'static str, names: &[String]) -> StoreResult<Vec<T>> {
    names.iter().map(|n| lookup(map, kind, n)).collect()
}

fn feature_specs(names: &Names, features: &BTreeMap<String, String>) -> StoreResult<Vec<FeatureSpec>> {
    features
        .iter()
        .map(|(feature, value)| Ok(FeatureSpec::new(lookup(&names.features, "feature", feature)?, value.clone())))
        .collect()
}

impl ModelDocument {
    pub fn from_json(text: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> StoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Insert every record of the document into `store`
    pub fn import(&self, store: &LexiconStore) -> StoreResult<ImportedModel> {
        let imported = store.run_exclusive(|txn| self.import_into(txn))?;
        info!(
            entries = imported.entries.len(),
            wordforms = imported.wordforms.len(),
            "model document imported"
        );
        Ok(imported)
    }

    fn import_into(&self, txn: &mut Transaction<'_>) -> StoreResult<ImportedModel> {
        let mut names = Names::default();
        let mut imported = ImportedModel::default();

        for doc in &self.features {
            if names.features.contains_key(&doc.name) {
                return Err(StoreError::duplicate("feature", &doc.name));
            }
            let id = txn.insert(|id| FeatureDefn {
                id,
                name: doc.name.clone(),
                domain: doc.domain,
                values: doc.values.clone(),
            });
            names.features.insert(doc.name.clone(), id);
        }

        for doc in &self.phonemes {
            let features = feature_specs(&names, &doc.features)?;
            let codes = if doc.codes.is_empty() { vec![doc.name.clone()] } else { doc.codes.clone() };
            let id = txn.insert(|id| Phoneme {
                id,
                name: doc.name.clone(),
                codes,
                features,
            });
            names.phonemes.insert(doc.name.clone(), id);
        }

        for doc in &self.boundaries {
            txn.insert(|id| BoundaryMarker {
                id,
                name: doc.name.clone(),
                code: doc.code.clone(),
            });
        }

        for doc in &self.natural_classes {
            let members = if doc.segments.is_empty() {
                ClassMembers::Features(feature_specs(&names, &doc.features)?)
            } else {
                ClassMembers::Segments(lookup_all(&names.phonemes, "phoneme", &doc.segments)?)
            };
            txn.insert(|id| NaturalClass {
                id,
                abbreviation: doc.abbr.clone(),
                members,
            });
        }

        for doc in &self.mpr_groups {
            let id = txn.insert(|id| MprGroup {
                id,
                name: doc.name.clone(),
                match_all: doc.match_all,
            });
            names.mpr_groups.insert(doc.name.clone(), id);
        }

        for doc in &self.mpr_features {
            let group = lookup_opt(&names.mpr_groups, "exception feature group", &doc.group)?;
            let id = txn.insert(|id| MprFeature {
                id,
                name: doc.name.clone(),
                group,
            });
            names.mpr_features.insert(doc.name.clone(), id);
        }

        self.import_categories(txn, &mut names, &mut imported)?;

        for doc in &self.infl_types {
            let features = feature_specs(&names, &doc.features)?;
            let null_slots = lookup_all(&names.slots, "slot", &doc.null_slots)?;
            let id = txn.insert(|id| InflectionType {
                id,
                name: doc.name.clone(),
                features,
                null_slots,
            });
            imported.infl_types.insert(doc.name.clone(), id);
        }

        self.import_entries(txn, &names, &mut imported)?;
        self.import_rules(txn, &names)?;
        self.import_prohibitions(txn, &imported)?;

        for form in &self.wordforms {
            if imported.wordforms.contains_key(form) {
                continue;
            }
            let id = txn.insert(|id| Wordform {
                id,
                form: form.clone(),
                checksum: None,
                analyses: Vec::new(),
            });
            imported.wordforms.insert(form.clone(), id);
        }

        Ok(imported)
    }

    fn import_categories(&self, txn: &mut Transaction<'_>, names: &mut Names, imported: &mut ImportedModel) -> StoreResult<()> {
        for doc in &self.parts_of_speech {
            if imported.parts_of_speech.contains_key(&doc.abbr) {
                return Err(StoreError::duplicate("part of speech", &doc.abbr));
            }
            let parent = lookup_opt(&imported.parts_of_speech, "part of speech", &doc.parent)?;
            let pos = txn.insert(|id| PartOfSpeech {
                id,
                abbreviation: doc.abbr.clone(),
                name: doc.name.clone().unwrap_or_else(|| doc.abbr.clone()),
                parent,
            });
            imported.parts_of_speech.insert(doc.abbr.clone(), pos);

            for class in &doc.infl_classes {
                let parent = lookup_opt(&names.infl_classes, "inflection class", &class.parent)?;
                let id = txn.insert(|id| InflectionClass {
                    id,
                    pos,
                    abbreviation: class.abbr.clone(),
                    parent,
                });
                names.infl_classes.insert(class.abbr.clone(), id);
            }

            for slot in &doc.slots {
                if names.slots.contains_key(&slot.name) {
                    return Err(StoreError::duplicate("slot", &slot.name));
                }
                let id = txn.insert(|id| AffixSlot {
                    id,
                    pos,
                    name: slot.name.clone(),
                    optional: slot.optional,
                });
                names.slots.insert(slot.name.clone(), id);
            }

            for template in &doc.templates {
                let prefix_slots = lookup_all(&names.slots, "slot", &template.prefix_slots)?;
                let suffix_slots = lookup_all(&names.slots, "slot", &template.suffix_slots)?;
                txn.insert(|id| AffixTemplate {
                    id,
                    pos,
                    name: template.name.clone(),
                    prefix_slots,
                    suffix_slots,
                    disabled: template.disabled,
                });
            }
        }
        Ok(())
    }

    fn import_entries(&self, txn: &mut Transaction<'_>, names: &Names, imported: &mut ImportedModel) -> StoreResult<()> {
        // Entries are created first so variants may point at entries listed later.
        for doc in &self.entries {
            if imported.entries.contains_key(&doc.key) {
                return Err(StoreError::duplicate("entry", &doc.key));
            }
            let citation = doc.citation.clone().or_else(|| doc.forms.first().map(|f| f.form.clone())).unwrap_or_default();
            let id = txn.insert(|id| LexEntry {
                id,
                citation,
                forms: Vec::new(),
                msas: Vec::new(),
                senses: Vec::new(),
                variant_of: None,
                exception_features: Vec::new(),
            });
            imported.entries.insert(doc.key.clone(), id);
        }

        for doc in &self.entries {
            let entry = lookup(&imported.entries, "entry", &doc.key)?;

            let mut forms = Vec::with_capacity(doc.forms.len());
            for form in &doc.forms {
                let infl_classes = lookup_all(&names.infl_classes, "inflection class", &form.infl_classes)?;
                forms.push(txn.insert(|id| Allomorph {
                    id,
                    entry,
                    form: form.form.clone(),
                    morph_type: form.morph_type,
                    is_abstract: form.is_abstract,
                    environments: form.environments.clone(),
                    infl_classes,
                }));
            }

            let mut msas = Vec::with_capacity(doc.msas.len());
            for msa in &doc.msas {
                let kind = self.msa_kind(msa, names, imported)?;
                msas.push(txn.insert(|id| Msa { id, entry, kind }));
            }

            let gloss = doc.gloss.clone().unwrap_or_else(|| doc.key.clone());
            let first_msa = msas.first().copied();
            let sense = txn.insert(|id| LexSense {
                id,
                entry,
                gloss,
                msa: first_msa,
            });

            let variant_of = match &doc.variant_of {
                Some(variant) => Some(VariantOf {
                    main: lookup(&imported.entries, "entry", &variant.entry)?,
                    infl_type: lookup_opt(&imported.infl_types, "inflection type", &variant.infl_type)?,
                }),
                None => None,
            };
            let exception_features = lookup_all(&names.mpr_features, "exception feature", &doc.exception_features)?;

            txn.update::<LexEntry>(entry, |e| {
                e.forms = forms.clone();
                e.msas = msas.clone();
                e.senses = vec![sense];
                e.variant_of = variant_of;
                e.exception_features = exception_features;
            });
            imported.allomorphs.insert(doc.key.clone(), forms);
            imported.msas.insert(doc.key.clone(), msas);
        }
        Ok(())
    }

    fn msa_kind(&self, msa: &MsaDoc, names: &Names, imported: &ImportedModel) -> StoreResult<MsaKind> {
        let pos_names = &imported.parts_of_speech;
        Ok(match msa {
            MsaDoc::Stem { pos, infl_class, features } => MsaKind::Stem {
                pos: lookup_opt(pos_names, "part of speech", pos)?,
                infl_class: lookup_opt(&names.infl_classes, "inflection class", infl_class)?,
                features: feature_specs(names, features)?,
            },
            MsaDoc::Infl { pos, slots, features } => MsaKind::InflAffix {
                pos: lookup_opt(pos_names, "part of speech", pos)?,
                slots: lookup_all(&names.slots, "slot", slots)?,
                features: feature_specs(names, features)?,
            },
            MsaDoc::Deriv {
                from_pos,
                to_pos,
                from_infl_class,
                to_infl_class,
                from_features,
                to_features,
            } => MsaKind::DerivAffix {
                from_pos: lookup_opt(pos_names, "part of speech", from_pos)?,
                to_pos: lookup_opt(pos_names, "part of speech", to_pos)?,
                from_infl_class: lookup_opt(&names.infl_classes, "inflection class", from_infl_class)?,
                to_infl_class: lookup_opt(&names.infl_classes, "inflection class", to_infl_class)?,
                from_features: feature_specs(names, from_features)?,
                to_features: feature_specs(names, to_features)?,
            },
            MsaDoc::Unclassified { pos } => MsaKind::UnclassifiedAffix {
                pos: lookup_opt(pos_names, "part of speech", pos)?,
            },
        })
    }

    fn import_rules(&self, txn: &mut Transaction<'_>, names: &Names) -> StoreResult<()> {
        for (index, doc) in self.phon_rules.iter().enumerate() {
            let kind = match &doc.body {
                PhonRuleBodyDoc::Rewrite { input, subrules } => PhonRuleKind::Rewrite {
                    input: input.clone(),
                    subrules: subrules
                        .iter()
                        .map(|s| RewriteSubrule {
                            output: s.output.clone(),
                            left: s.left.clone(),
                            right: s.right.clone(),
                            required_pos: Vec::new(),
                        })
                        .collect(),
                },
                PhonRuleBodyDoc::Metathesis {
                    left,
                    left_switch,
                    right_switch,
                    right,
                } => PhonRuleKind::Metathesis {
                    left: left.clone(),
                    left_switch: left_switch.clone(),
                    right_switch: right_switch.clone(),
                    right: right.clone(),
                },
            };
            let required_mpr = lookup_all(&names.mpr_features, "exception feature", &doc.required_mpr)?;
            let excluded_mpr = lookup_all(&names.mpr_features, "exception feature", &doc.excluded_mpr)?;
            txn.insert(|id| PhonRule {
                id,
                name: doc.name.clone(),
                order: doc.order.unwrap_or(index as u32),
                disabled: doc.disabled,
                kind,
                required_mpr,
                excluded_mpr,
            });
        }
        Ok(())
    }

    fn import_prohibitions(&self, txn: &mut Transaction<'_>, imported: &ImportedModel) -> StoreResult<()> {
        for doc in &self.prohibitions {
            let (target, adjacency) = match doc {
                ProhibitionDoc::Allomorphs { first, others, adjacency } => (
                    ProhibitionTarget::Allomorphs {
                        first: resolve_allomorph(imported, first)?,
                        others: others.iter().map(|o| resolve_allomorph(imported, o)).collect::<StoreResult<_>>()?,
                    },
                    *adjacency,
                ),
                ProhibitionDoc::Morphemes { first, others, adjacency } => (
                    ProhibitionTarget::Morphemes {
                        first: lookup(&imported.entries, "entry", first)?,
                        others: lookup_all(&imported.entries, "entry", others)?,
                    },
                    *adjacency,
                ),
            };
            txn.insert(|id| Prohibition {
                id,
                target,
                adjacency,
                disabled: false,
            });
        }
        Ok(())
    }
}

fn resolve_allomorph(imported: &ImportedModel, reference: &str) -> StoreResult<AllomorphId> {
    let (key, index) = match reference.split_once('#') {
        Some((key, index)) => {
            let index = index
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidDocument(format!("bad allomorph index in '{reference}'")))?;
            (key, index)
        }
        None => (reference, 0),
    };
    imported
        .allomorphs
        .get(key)
        .and_then(|forms| forms.get(index))
        .copied()
        .ok_or_else(|| StoreError::unknown("allomorph", reference))
}
