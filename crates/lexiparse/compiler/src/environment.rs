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

//! Phonological environments
//!
//! An environment is written `/ LEFT _ RIGHT`. Each side is a sequence of
//! literal segments, `[Class]` natural-class references and `(..)` optional
//! groups. A `#` word boundary may only appear at the outer edge of a side:
//! first on the left, last on the right. The same side grammar is used for
//! the contexts of phonological rules.

use crate::grammar::CompiledClass;
use crate::symbols::{SegId, SymbolTable};
use serde::Serialize;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EnvItem {
    Segment(SegId),
    /// Index into the grammar's natural classes
    Class(usize),
    Optional(Vec<EnvItem>),
}

impl EnvItem {
    /// Whether a single-position item accepts `seg`
    pub fn accepts(&self, seg: SegId, classes: &[CompiledClass]) -> bool {
        match self {
            Self::Segment(s) => *s == seg,
            Self::Class(c) => classes.get(*c).is_some_and(|class| class.members.contains(&seg)),
            Self::Optional(_) => false,
        }
    }
}

/// One side of an environment or rule context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Side {
    pub items: Vec<EnvItem>,
    /// Side touches the word boundary
    pub anchored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    /// Word boundaries are not permitted
    Inner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Leftward,
    Rightward,
}

impl Side {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && !self.anchored
    }

    /// Whether the side matches immediately to the left of boundary `pos`
    pub fn matches_left(&self, shape: &[SegId], pos: usize, classes: &[CompiledClass]) -> bool {
        let ends = advance(&self.items, shape, vec![pos], Direction::Leftward, classes);
        if self.anchored { ends.contains(&0) } else { !ends.is_empty() }
    }

    /// Whether the side matches immediately to the right of boundary `pos`
    pub fn matches_right(&self, shape: &[SegId], pos: usize, classes: &[CompiledClass]) -> bool {
        let ends = advance(&self.items, shape, vec![pos], Direction::Rightward, classes);
        if self.anchored { ends.contains(&shape.len()) } else { !ends.is_empty() }
    }
}

fn advance(items: &[EnvItem], shape: &[SegId], mut positions: Vec<usize>, direction: Direction, classes: &[CompiledClass]) -> Vec<usize> {
    let ordered: Box<dyn Iterator<Item = &EnvItem>> = match direction {
        Direction::Leftward => Box::new(items.iter().rev()),
        Direction::Rightward => Box::new(items.iter()),
    };
    for item in ordered {
        if positions.is_empty() {
            break;
        }
        positions = match item {
            EnvItem::Optional(group) => {
                let mut next = advance(group, shape, positions.clone(), direction, classes);
                next.extend(positions);
                next
            }
            single => positions
                .into_iter()
                .filter_map(|p| match direction {
                    Direction::Leftward if p > 0 && single.accepts(shape[p - 1], classes) => Some(p - 1),
                    Direction::Rightward if p < shape.len() && single.accepts(shape[p], classes) => Some(p + 1),
                    _ => None,
                })
                .collect(),
        };
        positions.sort_unstable();
        positions.dedup();
    }
    positions
}

/// Parsed `/ LEFT _ RIGHT` environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub left: Side,
    pub right: Side,
}

impl Environment {
    /// Whether the span `start..end` of `shape` sits in this environment
    pub fn matches(&self, shape: &[SegId], start: usize, end: usize, classes: &[CompiledClass]) -> bool {
        self.left.matches_left(shape, start, classes) && self.right.matches_right(shape, end, classes)
    }
}

/// Whether any of `environments` holds; an empty list always does
pub fn any_matches(environments: &[Environment], shape: &[SegId], start: usize, end: usize, classes: &[CompiledClass]) -> bool {
    environments.is_empty() || environments.iter().any(|env| env.matches(shape, start, end, classes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvError {
    pub offset: usize,
    pub reason: String,
}

impl EnvError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self { offset, reason: reason.into() }
    }
}

/// Parser for environments and rule contexts over one symbol table
pub struct EnvParser<'a> {
    symbols: &'a SymbolTable,
    classes: &'a HashMap<String, usize>,
}

impl<'a> EnvParser<'a> {
    pub fn new(symbols: &'a SymbolTable, classes: &'a HashMap<String, usize>) -> Self {
        Self { symbols, classes }
    }

    pub fn parse_environment(&self, text: &str) -> Result<Environment, EnvError> {
        let text: String = text.nfd().collect();
        let start = text.len() - text.trim_start().len();
        if !text[start..].starts_with('/') {
            return Err(EnvError::new(start, "environment must start with '/'"));
        }
        let body = start + 1;
        let mut underscores = text[body..].match_indices('_').map(|(i, _)| body + i);
        let Some(focus) = underscores.next() else {
            return Err(EnvError::new(text.len(), "missing '_'"));
        };
        if let Some(extra) = underscores.next() {
            return Err(EnvError::new(extra, "more than one '_'"));
        }
        Ok(Environment {
            left: self.parse_side_at(&text[body..focus], body, Edge::Left)?,
            right: self.parse_side_at(&text[focus + 1..], focus + 1, Edge::Right)?,
        })
    }

    /// Parse a bare side such as a rule context or rule input
    pub fn parse_side(&self, text: &str, edge: Edge) -> Result<Side, EnvError> {
        let text: String = text.nfd().collect();
        self.parse_side_at(&text, 0, edge)
    }

    fn parse_side_at(&self, text: &str, base: usize, edge: Edge) -> Result<Side, EnvError> {
        let mut side = Side::default();
        let mut i = 0;
        while i < text.len() {
            let rest = &text[i..];
            let Some(c) = rest.chars().next() else { break };
            match c {
                c if c.is_whitespace() => i += c.len_utf8(),
                '#' => {
                    let at_edge = match edge {
                        Edge::Left => side.items.is_empty() && !side.anchored,
                        Edge::Right => rest[1..].trim().is_empty(),
                        Edge::Inner => false,
                    };
                    if !at_edge {
                        return Err(EnvError::new(base + i, "word boundary must be at the outer edge"));
                    }
                    side.anchored = true;
                    i += 1;
                }
                '[' => {
                    let close = rest.find(']').ok_or_else(|| EnvError::new(base + i, "unclosed '['"))?;
                    let name = rest[1..close].trim();
                    let class = self.classes.get(name).ok_or_else(|| EnvError::new(base + i + 1, format!("unknown natural class '{name}'")))?;
                    side.items.push(EnvItem::Class(*class));
                    i += close + 1;
                }
                '(' => {
                    let close = matching_paren(rest).ok_or_else(|| EnvError::new(base + i, "unclosed '('"))?;
                    let group = self.parse_side_at(&rest[1..close], base + i + 1, Edge::Inner)?;
                    if group.items.is_empty() {
                        return Err(EnvError::new(base + i, "empty optional group"));
                    }
                    side.items.push(EnvItem::Optional(group.items));
                    i += close + 1;
                }
                ')' | ']' => return Err(EnvError::new(base + i, format!("unexpected '{c}'"))),
                _ => {
                    let (len, seg) = self.symbols.match_prefix(rest).ok_or_else(|| EnvError::new(base + i, "unknown symbol"))?;
                    if let Some(seg) = seg {
                        side.items.push(EnvItem::Segment(seg));
                    }
                    i += len;
                }
            }
        }
        Ok(side)
    }
}

fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexidb_core::{LinguisticModel, NaturalClassId, ObjectId, Phoneme, PhonemeId};
    use std::collections::BTreeSet;

    struct Fixture {
        symbols: SymbolTable,
        names: HashMap<String, usize>,
        classes: Vec<CompiledClass>,
    }

    fn fixture() -> Fixture {
        let mut model = LinguisticModel::default();
        for (n, code) in ["a", "i", "k", "t"].iter().enumerate() {
            let id = PhonemeId(ObjectId(n as u64 + 1));
            model.phonemes.insert(
                id,
                Phoneme {
                    id,
                    name: code.to_string(),
                    codes: vec![code.to_string()],
                    features: Vec::new(),
                },
            );
        }
        let symbols = SymbolTable::build(&model);
        let vowels: BTreeSet<SegId> = [symbols.tokenize("a").unwrap()[0], symbols.tokenize("i").unwrap()[0]].into_iter().collect();
        let classes = vec![CompiledClass {
            source: NaturalClassId(ObjectId(10)),
            abbreviation: "V".into(),
            members: vowels,
        }];
        let names = HashMap::from([("V".to_string(), 0)]);
        Fixture { symbols, names, classes }
    }

    #[test]
    fn test_parse_environment_sides() {
        let f = fixture();
        let env = EnvParser::new(&f.symbols, &f.names).parse_environment("/ #k _ [V]").expect("parses");
        assert!(env.left.anchored);
        assert_eq!(env.left.items.len(), 1);
        assert_eq!(env.right.items, vec![EnvItem::Class(0)]);
        assert!(!env.right.anchored);
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        let f = fixture();
        let parser = EnvParser::new(&f.symbols, &f.names);
        assert_eq!(parser.parse_environment("k _").unwrap_err().offset, 0);
        assert_eq!(parser.parse_environment("/ k # _").unwrap_err().offset, 4);
        assert_eq!(parser.parse_environment("/ _ # k").unwrap_err().offset, 4);
        assert_eq!(parser.parse_environment("/ _ [C]").unwrap_err().offset, 5);
        assert_eq!(parser.parse_environment("/ _ x").unwrap_err().offset, 4);
        assert!(parser.parse_environment("/ k").is_err());
        assert!(parser.parse_environment("/ _ (k").is_err());
    }

    #[test]
    fn test_matching_with_anchors_and_optionals() {
        let f = fixture();
        let parser = EnvParser::new(&f.symbols, &f.names);
        let word = f.symbols.tokenize("kati").unwrap();

        let after_initial_k = parser.parse_environment("/ #k _").unwrap();
        assert!(after_initial_k.matches(&word, 1, 2, &f.classes));
        assert!(!after_initial_k.matches(&word, 3, 4, &f.classes));

        let before_final_vowel = parser.parse_environment("/ _ [V]#").unwrap();
        assert!(before_final_vowel.matches(&word, 2, 3, &f.classes));
        assert!(!before_final_vowel.matches(&word, 0, 1, &f.classes));

        let optional = parser.parse_environment("/ #(k)[V] _").unwrap();
        assert!(optional.matches(&word, 2, 2, &f.classes));
        let bare = f.symbols.tokenize("at").unwrap();
        assert!(optional.matches(&bare, 1, 1, &f.classes));
    }
}
