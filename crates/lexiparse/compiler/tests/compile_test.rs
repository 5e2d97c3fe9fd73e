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

//! Compiling model documents into grammars

use lexidb_core::{LexiconStore, ModelDocument};
use lexiparse_compiler::*;

fn phonemes(letters: &str) -> serde_json::Value {
    serde_json::Value::Array(letters.chars().map(|c| serde_json::json!({ "name": c.to_string() })).collect())
}

fn compile(document: serde_json::Value, config: CompilerConfig) -> (CompiledGrammar, Vec<CompileError>) {
    let store = LexiconStore::new();
    ModelDocument::from_value(document).expect("document").import(&store).expect("import");
    let mut errors = Vec::new();
    let grammar = GrammarCompiler::new(config).compile(&store.snapshot(), &mut errors);
    (grammar, errors)
}

fn base(entries: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "features": [
            { "name": "num", "domain": "syntactic", "values": ["sg", "pl"] },
            { "name": "tense", "domain": "syntactic", "values": ["pres", "past"] }
        ],
        "phonemes": phonemes("abcdegiklmnoprstuw"),
        "boundaries": [{ "name": "morpheme", "code": "+" }],
        "natural_classes": [
            { "abbr": "V", "segments": ["a", "e", "i", "o", "u"] },
            { "abbr": "C", "segments": ["b", "c", "d", "g", "k", "l", "m", "n", "p", "r", "s", "t", "w"] }
        ],
        "parts_of_speech": [
            { "abbr": "n", "slots": [{ "name": "NUM", "optional": true }, { "name": "CASE", "optional": true }], "templates": [{ "name": "noun", "suffix_slots": ["NUM", "CASE"] }] },
            { "abbr": "v", "slots": [{ "name": "TNS" }], "templates": [{ "name": "verb", "suffix_slots": ["TNS"] }] }
        ],
        "infl_types": [{ "name": "PAST", "features": { "tense": "past" }, "null_slots": ["TNS"] }],
        "entries": entries
    })
}

fn toy_entries() -> serde_json::Value {
    serde_json::json!([
        { "key": "cat", "forms": [{ "form": "cat", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
        { "key": "PL", "forms": [{ "form": "-s", "type": "suffix" }], "msas": [{ "kind": "infl", "pos": "n", "slots": ["NUM"], "features": { "num": "pl" } }] },
        { "key": "go", "forms": [{ "form": "go", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "v" }] },
        { "key": "went", "forms": [{ "form": "went", "type": "stem" }], "variant_of": { "entry": "go", "infl_type": "PAST" } },
        { "key": "PST", "forms": [{ "form": "-ed", "type": "suffix" }], "msas": [{ "kind": "infl", "pos": "v", "slots": ["TNS"], "features": { "tense": "past" } }] }
    ])
}

#[test]
fn test_compiles_lexicon_and_rules() {
    let (grammar, errors) = compile(base(toy_entries()), CompilerConfig::default());
    assert!(errors.is_empty(), "{errors:?}");

    assert_eq!(grammar.lexicon.len(), 3);
    assert_eq!(grammar.rules.len(), 2);
    let cat = grammar.symbols.tokenize("cat").expect("tokenizes");
    assert_eq!(grammar.lookup(&cat).len(), 1);
    assert_eq!(grammar.lookup(&grammar.symbols.tokenize("ca+t").expect("tokenizes")), grammar.lookup(&cat));

    let plural = &grammar.rules[0];
    assert_eq!(plural.kind, AffixKind::Suffix);
    assert_eq!(plural.allomorphs[0].process, ProcessAllomorph::suffix(grammar.symbols.tokenize("s").expect("tokenizes")));
}

#[test]
fn test_variant_gets_null_affix_and_template_slot() {
    let (grammar, _) = compile(base(toy_entries()), CompilerConfig::default());

    let went = grammar.lexicon.iter().find(|e| e.infl_type.is_some()).expect("variant stem");
    let go = grammar.lexicon.iter().find(|e| e.gloss == "go").expect("main stem");
    assert_eq!(went.msa, go.msa, "variants analyze to the main entry's analysis");
    assert_eq!(grammar.null_affixes.len(), 1);

    let verb = grammar.templates.iter().find(|t| t.name == "verb").expect("verb template");
    assert_eq!(verb.suffix_slots[0].null_for, vec![went.infl_type.expect("infl type")]);

    let (without, _) = compile(base(toy_entries()), CompilerConfig { null_affixes: false });
    assert!(without.null_affixes.is_empty());
}

#[test]
fn test_slots_without_rules_are_skipped() {
    let (grammar, _) = compile(base(toy_entries()), CompilerConfig::default());
    let noun = grammar.templates.iter().find(|t| t.name == "noun").expect("noun template");
    let names: Vec<&str> = noun.suffix_slots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["NUM"]);
}

#[test]
fn test_bad_items_are_reported_and_omitted() {
    let entries = serde_json::json!([
        { "key": "cat", "forms": [{ "form": "cat", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
        { "key": "bad", "forms": [{ "form": "ca%t", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
        { "key": "env", "forms": [{ "form": "-es", "type": "suffix", "environments": ["/ [X] _"] }], "msas": [{ "kind": "infl", "pos": "n", "slots": ["NUM"] }] },
        { "key": "sim", "forms": [{ "form": "a", "type": "simulfix" }], "msas": [{ "kind": "deriv" }] },
        { "key": "red", "forms": [{ "form": "[Q]-", "type": "prefix" }], "msas": [{ "kind": "deriv" }] }
    ]);
    let (grammar, errors) = compile(base(entries), CompilerConfig::default());

    assert_eq!(grammar.lexicon.len(), 1);
    assert!(grammar.rules.is_empty());
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(matches!(&errors[0], CompileError::InvalidShape { form, offset: 2, .. } if form == "ca%t"));
    assert!(matches!(&errors[1], CompileError::InvalidEnvironment { offset: 3, .. }));
    assert!(matches!(&errors[2], CompileError::UnsupportedMorphType { .. }));
    assert!(matches!(&errors[3], CompileError::InvalidReduplication { .. }));
}

#[test]
fn test_reduplication_and_circumfix_processes() {
    let entries = serde_json::json!([
        { "key": "RED", "forms": [{ "form": "[C][V]-", "type": "prefix" }], "msas": [{ "kind": "deriv" }] },
        { "key": "CIRC", "forms": [{ "form": "ge...t", "type": "circumfix" }], "msas": [{ "kind": "deriv" }] },
        { "key": "UM", "forms": [{ "form": "-um-", "type": "infix", "environments": ["/ #[C] _"] }], "msas": [{ "kind": "deriv" }] }
    ]);
    let (grammar, errors) = compile(base(entries), CompilerConfig::default());
    assert!(errors.is_empty(), "{errors:?}");

    let red = &grammar.rules[0].allomorphs[0].process;
    assert_eq!(red.lhs, vec![LhsPart::Class(1), LhsPart::Class(0), LhsPart::Any]);
    assert_eq!(red.rhs, vec![RhsPart::Copy(0), RhsPart::Copy(1), RhsPart::Copy(0), RhsPart::Copy(1), RhsPart::Copy(2)]);

    let circ = &grammar.rules[1].allomorphs[0].process;
    assert_eq!(circ.rhs.len(), 3);

    let infix = &grammar.rules[2].allomorphs[0].process;
    assert!(infix.split.as_ref().is_some_and(|env| env.left.anchored));
}

#[test]
fn test_prohibitions_expand_cartesian_product() {
    let entries = serde_json::json!([
        { "key": "A", "forms": [{ "form": "-a", "type": "suffix" }, { "form": "-e", "type": "suffix" }], "msas": [{ "kind": "deriv" }] },
        { "key": "B", "forms": [{ "form": "-i", "type": "suffix" }, { "form": "-o", "type": "suffix" }], "msas": [{ "kind": "deriv" }] }
    ]);
    let mut document = base(entries);
    document["prohibitions"] = serde_json::json!([{ "kind": "morphemes", "first": "A", "others": ["B"], "adjacency": "adjacent_to_right" }]);
    let (grammar, _) = compile(document, CompilerConfig::default());
    assert_eq!(grammar.co_occurrences.len(), 4);
}

#[test]
fn test_phon_rules_follow_declared_order() {
    let mut document = base(toy_entries());
    document["phon_rules"] = serde_json::json!([
        { "name": "second", "order": 2, "kind": "rewrite", "input": "t", "subrules": [{ "output": "d", "left": "[V]", "right": "[V]" }] },
        { "name": "first", "order": 1, "kind": "rewrite", "input": "", "subrules": [{ "output": "e", "left": "s", "right": "s#" }] },
        { "name": "off", "order": 0, "disabled": true, "kind": "metathesis", "left_switch": "s", "right_switch": "k" }
    ]);
    let (grammar, errors) = compile(document, CompilerConfig::default());
    assert!(errors.is_empty(), "{errors:?}");
    let names: Vec<&str> = grammar.phon_rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert!(matches!(&grammar.phon_rules[0].kind, CompiledPhonRuleKind::Rewrite { subrules, .. } if subrules[0].right.anchored));
}

#[test]
fn test_empty_model_is_a_valid_grammar() {
    let (grammar, errors) = compile(serde_json::json!({}), CompilerConfig::default());
    assert!(errors.is_empty());
    assert_eq!(grammar.summary(), GrammarSummary::default());
}

#[test]
fn test_compile_is_deterministic() {
    let store = LexiconStore::new();
    ModelDocument::from_value(base(toy_entries())).expect("document").import(&store).expect("import");
    let compiler = GrammarCompiler::default();
    let snapshot = store.snapshot();

    let (first, stats) = compiler.compile_with_stats(&snapshot, &mut TracingSink::default());
    let second = compiler.compile(&snapshot, &mut Vec::<CompileError>::new());
    assert_eq!(first.summary(), second.summary());
    assert_eq!(stats.lexical_entries, 3);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.stage_times.len(), 4);
}
