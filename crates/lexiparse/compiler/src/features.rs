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

//! Flat feature structures with unification

use crate::error::{CompileError, CompileResult};
use lexidb_core::{FeatureId, FeatureSpec, LinguisticModel, ObjectId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureStruct {
    values: BTreeMap<FeatureId, String>,
}

impl FeatureStruct {
    /// Build from feature specs, checking every value against its definition
    pub fn from_specs(specs: &[FeatureSpec], model: &LinguisticModel, owner: impl Into<ObjectId>) -> CompileResult<Self> {
        let owner = owner.into();
        let mut values = BTreeMap::new();
        for spec in specs {
            let Some(defn) = model.features.get(&spec.feature) else {
                return Err(CompileError::DanglingReference {
                    owner,
                    target: spec.feature.into(),
                });
            };
            if !defn.values.iter().any(|v| *v == spec.value) {
                return Err(CompileError::UnknownFeatureValue {
                    owner,
                    feature: defn.name.clone(),
                    value: spec.value.clone(),
                });
            }
            values.insert(spec.feature, spec.value.clone());
        }
        Ok(Self { values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, feature: FeatureId) -> Option<&str> {
        self.values.get(&feature).map(String::as_str)
    }

    /// Union of both structures, or `None` when a feature has conflicting values
    pub fn unify(&self, other: &FeatureStruct) -> Option<FeatureStruct> {
        let mut values = self.values.clone();
        for (feature, value) in &other.values {
            match values.get(feature) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    values.insert(*feature, value.clone());
                }
            }
        }
        Some(Self { values })
    }

    /// Copy of `self` with every value of `other` written over it
    pub fn overlay(&self, other: &FeatureStruct) -> FeatureStruct {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(f, v)| (*f, v.clone())));
        Self { values }
    }

    /// Whether every value of `other` is present in `self`
    pub fn subsumed_by(&self, other: &FeatureStruct) -> bool {
        other.values.iter().all(|(f, v)| self.values.get(f) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(pairs: &[(u64, &str)]) -> FeatureStruct {
        FeatureStruct {
            values: pairs.iter().map(|(f, v)| (FeatureId(ObjectId(*f)), v.to_string())).collect(),
        }
    }

    #[test]
    fn test_unify_merges_compatible_values() {
        let merged = fs(&[(1, "pl")]).unify(&fs(&[(2, "3")])).expect("compatible");
        assert_eq!(merged, fs(&[(1, "pl"), (2, "3")]));
        assert_eq!(fs(&[(1, "pl")]).unify(&fs(&[(1, "pl")])), Some(fs(&[(1, "pl")])));
    }

    #[test]
    fn test_unify_rejects_conflicts() {
        assert!(fs(&[(1, "sg")]).unify(&fs(&[(1, "pl")])).is_none());
    }

    #[test]
    fn test_overlay_and_subsumption() {
        let base = fs(&[(1, "sg"), (2, "3")]);
        assert_eq!(base.overlay(&fs(&[(1, "pl")])), fs(&[(1, "pl"), (2, "3")]));
        assert!(base.subsumed_by(&fs(&[(2, "3")])));
        assert!(!base.subsumed_by(&fs(&[(2, "1")])));
    }

    #[test]
    fn test_from_specs_checks_values() {
        let mut model = LinguisticModel::default();
        let num = FeatureId(ObjectId(1));
        model.features.insert(
            num,
            lexidb_core::FeatureDefn {
                id: num,
                name: "num".into(),
                domain: lexidb_core::FeatureDomain::Syntactic,
                values: vec!["sg".into(), "pl".into()],
            },
        );
        let owner = ObjectId(7);
        assert!(FeatureStruct::from_specs(&[FeatureSpec::new(num, "pl")], &model, owner).is_ok());
        let err = FeatureStruct::from_specs(&[FeatureSpec::new(num, "du")], &model, owner).unwrap_err();
        assert!(matches!(err, CompileError::UnknownFeatureValue { ref value, .. } if value == "du"));
    }
}
