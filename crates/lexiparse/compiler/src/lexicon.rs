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

//! Lexical entries: stems, and the dispatch of affix and clitic forms to rules

use crate::compiler::BuildContext;
use crate::environment::Environment;
use crate::error::{CompileError, CompileErrorSink};
use crate::features::FeatureStruct;
use crate::grammar::{AffixKind, LexicalEntry, MorphRule, RuleAllomorph, RuleRole, StemAllomorph};
use crate::morphology;
use crate::symbols::Shape;
use lexidb_core::*;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// How a morph type is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormClass {
    Stem,
    Affix(AffixKind),
    Clitic(AffixKind),
    Unsupported,
}

impl FormClass {
    pub(crate) fn of(morph_type: MorphType) -> Self {
        match morph_type {
            MorphType::Root | MorphType::BoundRoot | MorphType::Stem | MorphType::BoundStem | MorphType::Particle | MorphType::Phrase | MorphType::Clitic => {
                Self::Stem
            }
            MorphType::Proclitic => Self::Clitic(AffixKind::Proclitic),
            MorphType::Enclitic => Self::Clitic(AffixKind::Enclitic),
            MorphType::Prefix | MorphType::PrefixingInterfix => Self::Affix(AffixKind::Prefix),
            MorphType::Suffix | MorphType::SuffixingInterfix => Self::Affix(AffixKind::Suffix),
            MorphType::Infix | MorphType::InfixingInterfix => Self::Affix(AffixKind::Infix),
            MorphType::Circumfix => Self::Affix(AffixKind::Circumfix),
            MorphType::Simulfix | MorphType::Suprafix => Self::Unsupported,
        }
    }
}

/// Tokenize a literal form; reports the failing offset relative to `form`
pub(crate) fn tokenize_form(ctx: &BuildContext<'_>, owner: AllomorphId, form: &str, text: &str, offset: usize, sink: &mut dyn CompileErrorSink) -> Option<Shape> {
    let text: String = text.nfd().collect();
    match ctx.symbols.tokenize(&text) {
        Ok(shape) => Some(shape),
        Err(at) => {
            sink.report(CompileError::invalid_shape(owner, form, offset + at));
            None
        }
    }
}

pub(crate) fn parse_environments(ctx: &BuildContext<'_>, owner: AllomorphId, environments: &[String], sink: &mut dyn CompileErrorSink) -> Option<Vec<Environment>> {
    let parser = ctx.env_parser();
    let mut parsed = Vec::with_capacity(environments.len());
    for text in environments {
        match parser.parse_environment(text) {
            Ok(env) => parsed.push(env),
            Err(err) => {
                sink.report(CompileError::invalid_environment(owner, text.as_str(), err.offset, err.reason));
                return None;
            }
        }
    }
    Some(parsed)
}

#[derive(Default)]
struct EntryForms {
    stems: Vec<StemAllomorph>,
    affixes: Vec<(AffixKind, RuleAllomorph)>,
    clitics: Vec<(AffixKind, RuleAllomorph)>,
}

/// Compile every lexical entry into stems and morphological rules
pub(crate) fn build_lexicon(ctx: &BuildContext<'_>, sink: &mut dyn CompileErrorSink) -> (Vec<LexicalEntry>, Vec<MorphRule>) {
    let model = ctx.model;
    let mut lexicon = Vec::new();
    let mut rules = Vec::new();

    for entry in model.entries.values() {
        let gloss = model.gloss_of(entry.id).unwrap_or(entry.citation.as_str()).to_string();

        let mut exception_features = entry.exception_features.clone();
        let mut infl_type = None;
        let mut msas = entry.msas.clone();
        if let Some(variant) = &entry.variant_of {
            infl_type = variant.infl_type;
            if let Some(main) = model.entries.get(&variant.main) {
                if msas.is_empty() {
                    msas = main.msas.clone();
                }
                exception_features.extend(main.exception_features.iter().copied());
            } else {
                sink.report(CompileError::DanglingReference {
                    owner: entry.id.into(),
                    target: variant.main.into(),
                });
                continue;
            }
        }
        if msas.is_empty() {
            debug!(entry = %entry.id, "entry has no morphosyntactic analysis; skipped");
            continue;
        }

        let forms = collect_forms(ctx, entry, sink);

        for msa_id in msas {
            let Some(msa) = model.msas.get(&msa_id) else {
                sink.report(CompileError::DanglingReference {
                    owner: entry.id.into(),
                    target: msa_id.into(),
                });
                continue;
            };
            match &msa.kind {
                MsaKind::Stem { pos, infl_class, features } => {
                    if !forms.stems.is_empty() {
                        if let Some(features) = stem_features(ctx, msa_id, features, infl_type, sink) {
                            lexicon.push(LexicalEntry {
                                entry: entry.id,
                                msa: msa_id,
                                infl_type,
                                pos: *pos,
                                infl_class: *infl_class,
                                features,
                                exception_features: exception_features.clone(),
                                allomorphs: forms.stems.clone(),
                                gloss: gloss.clone(),
                            });
                        }
                    }
                    if let Some((kind, _)) = forms.clitics.first() {
                        rules.push(MorphRule {
                            entry: entry.id,
                            msa: msa_id,
                            kind: *kind,
                            role: RuleRole::Clitic,
                            allomorphs: forms.clitics.iter().map(|(_, a)| a.clone()).collect(),
                            exception_features: exception_features.clone(),
                            gloss: gloss.clone(),
                        });
                    }
                }
                affix_kind => {
                    let Some((kind, _)) = forms.affixes.first() else {
                        debug!(entry = %entry.id, msa = %msa_id, "affix analysis without affix forms; skipped");
                        continue;
                    };
                    let Some(role) = affix_role(ctx, msa_id, affix_kind, sink) else {
                        continue;
                    };
                    rules.push(MorphRule {
                        entry: entry.id,
                        msa: msa_id,
                        kind: *kind,
                        role,
                        allomorphs: forms.affixes.iter().map(|(_, a)| a.clone()).collect(),
                        exception_features: exception_features.clone(),
                        gloss: gloss.clone(),
                    });
                }
            }
        }
    }
    (lexicon, rules)
}

fn collect_forms(ctx: &BuildContext<'_>, entry: &LexEntry, sink: &mut dyn CompileErrorSink) -> EntryForms {
    let mut forms = EntryForms::default();
    for form_id in &entry.forms {
        let Some(allomorph) = ctx.model.allomorphs.get(form_id) else {
            sink.report(CompileError::DanglingReference {
                owner: entry.id.into(),
                target: (*form_id).into(),
            });
            continue;
        };
        if allomorph.is_abstract || allomorph.form.trim().is_empty() {
            continue;
        }
        match FormClass::of(allomorph.morph_type) {
            FormClass::Stem => {
                let form = allomorph.form.trim();
                let offset = allomorph.form.len() - allomorph.form.trim_start().len();
                let Some(shape) = tokenize_form(ctx, allomorph.id, &allomorph.form, form, offset, sink) else {
                    continue;
                };
                let Some(environments) = parse_environments(ctx, allomorph.id, &allomorph.environments, sink) else {
                    continue;
                };
                if shape.is_empty() {
                    continue;
                }
                forms.stems.push(StemAllomorph {
                    source: allomorph.id,
                    shape,
                    environments,
                    bound: allomorph.morph_type.is_bound(),
                });
            }
            FormClass::Affix(kind) => {
                forms.affixes.extend(morphology::affix_allomorphs(ctx, allomorph, kind, sink).into_iter().map(|a| (kind, a)));
            }
            FormClass::Clitic(kind) => {
                forms.clitics.extend(morphology::affix_allomorphs(ctx, allomorph, kind, sink).into_iter().map(|a| (kind, a)));
            }
            FormClass::Unsupported => sink.report(CompileError::UnsupportedMorphType {
                owner: allomorph.id.into(),
                form: allomorph.form.clone(),
                morph_type: allomorph.morph_type,
            }),
        }
    }
    forms
}

fn stem_features(ctx: &BuildContext<'_>, msa: MsaId, features: &[FeatureSpec], infl_type: Option<InflTypeId>, sink: &mut dyn CompileErrorSink) -> Option<FeatureStruct> {
    let own = report(FeatureStruct::from_specs(features, ctx.model, msa), sink)?;
    let Some(infl_type) = infl_type else {
        return Some(own);
    };
    let Some(defn) = ctx.model.infl_types.get(&infl_type) else {
        sink.report(CompileError::DanglingReference {
            owner: msa.into(),
            target: infl_type.into(),
        });
        return None;
    };
    let inflected = report(FeatureStruct::from_specs(&defn.features, ctx.model, infl_type), sink)?;
    let unified = own.unify(&inflected);
    if unified.is_none() {
        sink.report(CompileError::invalid_rule(msa, format!("features of inflection type '{}' conflict with the stem", defn.name)));
    }
    unified
}

fn affix_role(ctx: &BuildContext<'_>, msa: MsaId, kind: &MsaKind, sink: &mut dyn CompileErrorSink) -> Option<RuleRole> {
    let model = ctx.model;
    Some(match kind {
        MsaKind::InflAffix { pos, slots, features } => RuleRole::Inflectional {
            pos: *pos,
            slots: slots.clone(),
            features: report(FeatureStruct::from_specs(features, model, msa), sink)?,
        },
        MsaKind::DerivAffix {
            from_pos,
            to_pos,
            from_infl_class,
            to_infl_class,
            from_features,
            to_features,
        } => RuleRole::Derivational {
            from_pos: *from_pos,
            to_pos: *to_pos,
            from_infl_class: *from_infl_class,
            to_infl_class: *to_infl_class,
            from_features: report(FeatureStruct::from_specs(from_features, model, msa), sink)?,
            to_features: report(FeatureStruct::from_specs(to_features, model, msa), sink)?,
        },
        MsaKind::UnclassifiedAffix { pos } => RuleRole::Unclassified { pos: *pos },
        MsaKind::Stem { .. } => return None,
    })
}

fn report<T>(result: Result<T, CompileError>, sink: &mut dyn CompileErrorSink) -> Option<T> {
    result.map_err(|err| sink.report(err)).ok()
}
