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

//! Applying and unapplying process allomorphs
//!
//! Application rewrites an input shape through `lhs -> rhs`, tracking which
//! morph every output segment came from. Unapplication runs the rewrite
//! backwards by matching `rhs` against a surface shape with a backtracking
//! matcher, yielding every input that would produce it.

use lexiparse_compiler::{CompiledClass, LhsPart, ProcessAllomorph, RhsPart, SegId, Shape};

/// Result of applying a process: the new shape and the morph index of each segment
pub type Tagged = (Shape, Vec<usize>);

fn lhs_accepts(part: &LhsPart, piece: &[SegId], classes: &[CompiledClass]) -> bool {
    match part {
        LhsPart::Any => true,
        LhsPart::Class(c) => piece.len() == 1 && classes.get(*c).is_some_and(|class| class.members.contains(&piece[0])),
    }
}

/// Split `input` into one range per lhs part, leftmost split first
fn bind_lhs(process: &ProcessAllomorph, input: &[SegId], classes: &[CompiledClass]) -> Option<Vec<(usize, usize)>> {
    fn go(process: &ProcessAllomorph, input: &[SegId], classes: &[CompiledClass], part: usize, pos: usize, ranges: &mut Vec<(usize, usize)>) -> bool {
        if part == process.lhs.len() {
            if pos != input.len() {
                return false;
            }
            return match &process.split {
                Some(env) => {
                    let at = ranges.first().map(|r| r.1).unwrap_or(0);
                    env.matches(input, at, at, classes)
                }
                None => true,
            };
        }
        let lengths: Vec<usize> = match process.lhs[part] {
            LhsPart::Class(_) => vec![1],
            LhsPart::Any => (0..=input.len() - pos).collect(),
        };
        for len in lengths {
            let end = pos + len;
            if end > input.len() || !lhs_accepts(&process.lhs[part], &input[pos..end], classes) {
                continue;
            }
            ranges.push((pos, end));
            if go(process, input, classes, part + 1, end, ranges) {
                return true;
            }
            ranges.pop();
        }
        false
    }

    let mut ranges = Vec::with_capacity(process.lhs.len());
    go(process, input, classes, 0, 0, &mut ranges).then_some(ranges)
}

/// Position of the rhs run that copies the whole input back in order
///
/// Copies outside that run are reduplicated material and belong to the affix.
fn identity_run(rhs: &[RhsPart], parts: usize) -> Option<usize> {
    let last = rhs.len().checked_sub(parts)?;
    (0..=last).find(|&k| rhs[k..k + parts].iter().enumerate().all(|(i, part)| *part == RhsPart::Copy(i)))
}

/// Apply `process` for morph number `morph`; `None` when the lhs does not match
pub fn apply(process: &ProcessAllomorph, input: &[SegId], origins: &[usize], morph: usize, classes: &[CompiledClass]) -> Option<Tagged> {
    let ranges = bind_lhs(process, input, classes)?;
    let run = identity_run(&process.rhs, process.lhs.len());
    let mut shape = Shape::new();
    let mut tags = Vec::new();
    for (at, part) in process.rhs.iter().enumerate() {
        match part {
            RhsPart::Copy(i) => {
                let (start, end) = *ranges.get(*i)?;
                shape.extend_from_slice(&input[start..end]);
                let original = match run {
                    Some(k) => (k..k + process.lhs.len()).contains(&at),
                    None => process.rhs.iter().position(|p| p == part) == Some(at),
                };
                if original {
                    tags.extend_from_slice(&origins[start..end]);
                } else {
                    tags.extend(std::iter::repeat_n(morph, end - start));
                }
            }
            RhsPart::Insert(inserted) => {
                shape.extend_from_slice(inserted);
                tags.extend(std::iter::repeat_n(morph, inserted.len()));
            }
        }
    }
    Some((shape, tags))
}

/// Every non-empty input that `process` maps onto `surface`
pub fn unapply(process: &ProcessAllomorph, surface: &[SegId], classes: &[CompiledClass]) -> Vec<Shape> {
    let mut bindings: Vec<Option<Shape>> = vec![None; process.lhs.len()];
    let mut found = Vec::new();
    match_rhs(process, surface, classes, 0, 0, &mut bindings, &mut found);
    found.sort();
    found.dedup();
    found
}

fn match_rhs(process: &ProcessAllomorph, surface: &[SegId], classes: &[CompiledClass], part: usize, pos: usize, bindings: &mut Vec<Option<Shape>>, found: &mut Vec<Shape>) {
    if part == process.rhs.len() {
        if pos == surface.len() {
            if let Some(input) = underlying(process, bindings, classes) {
                found.push(input);
            }
        }
        return;
    }
    match &process.rhs[part] {
        RhsPart::Insert(shape) => {
            if surface[pos..].starts_with(shape) {
                match_rhs(process, surface, classes, part + 1, pos + shape.len(), bindings, found);
            }
        }
        RhsPart::Copy(i) => {
            let i = *i;
            if i >= bindings.len() {
                return;
            }
            if let Some(bound) = bindings[i].clone() {
                if surface[pos..].starts_with(&bound) {
                    match_rhs(process, surface, classes, part + 1, pos + bound.len(), bindings, found);
                }
                return;
            }
            let lengths: Vec<usize> = match process.lhs[i] {
                LhsPart::Class(_) => vec![1],
                LhsPart::Any => (0..=surface.len() - pos).collect(),
            };
            for len in lengths {
                let end = pos + len;
                if end > surface.len() || !lhs_accepts(&process.lhs[i], &surface[pos..end], classes) {
                    continue;
                }
                bindings[i] = Some(surface[pos..end].to_vec());
                match_rhs(process, surface, classes, part + 1, end, bindings, found);
                bindings[i] = None;
            }
        }
    }
}

fn underlying(process: &ProcessAllomorph, bindings: &[Option<Shape>], classes: &[CompiledClass]) -> Option<Shape> {
    let mut input = Shape::new();
    let mut split = 0;
    for (i, binding) in bindings.iter().enumerate() {
        let piece = binding.as_ref()?;
        input.extend_from_slice(piece);
        if i == 0 {
            split = piece.len();
        }
    }
    if input.is_empty() {
        return None;
    }
    if let Some(env) = &process.split {
        if !env.matches(&input, split, split, classes) {
            return None;
        }
    }
    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexidb_core::{NaturalClassId, ObjectId};
    use lexiparse_compiler::{Environment, EnvItem, Side};
    use std::collections::BTreeSet;

    // segments: 0=t 1=a 2=k 3=u 4=m
    fn classes() -> Vec<CompiledClass> {
        vec![
            CompiledClass {
                source: NaturalClassId(ObjectId(1)),
                abbreviation: "C".into(),
                members: BTreeSet::from([0, 2, 4]),
            },
            CompiledClass {
                source: NaturalClassId(ObjectId(2)),
                abbreviation: "V".into(),
                members: BTreeSet::from([1, 3]),
            },
        ]
    }

    #[test]
    fn test_suffix_round_trip_keeps_origins() {
        let process = ProcessAllomorph::suffix(vec![4, 1]);
        let (shape, tags) = apply(&process, &[0, 1, 2], &[0, 0, 0], 1, &classes()).expect("applies");
        assert_eq!(shape, vec![0, 1, 2, 4, 1]);
        assert_eq!(tags, vec![0, 0, 0, 1, 1]);
        assert_eq!(unapply(&process, &shape, &classes()), vec![vec![0, 1, 2]]);
        assert!(unapply(&process, &[4, 1], &classes()).is_empty(), "the stem may not be empty");
    }

    #[test]
    fn test_reduplicating_prefix() {
        // [C][V]- : copies the first consonant and vowel of the stem
        let process = ProcessAllomorph {
            lhs: vec![LhsPart::Class(0), LhsPart::Class(1), LhsPart::Any],
            rhs: vec![RhsPart::Copy(0), RhsPart::Copy(1), RhsPart::Copy(0), RhsPart::Copy(1), RhsPart::Copy(2)],
            split: None,
        };
        let (shape, tags) = apply(&process, &[0, 1, 2, 1], &[0; 4], 1, &classes()).expect("applies");
        assert_eq!(shape, vec![0, 1, 0, 1, 2, 1]);
        assert_eq!(tags, vec![1, 1, 0, 0, 0, 0], "the reduplicant belongs to the affix");
        assert_eq!(unapply(&process, &shape, &classes()), vec![vec![0, 1, 2, 1]]);
        assert!(unapply(&process, &[0, 1, 2, 1, 2, 1], &classes()).is_empty());
        assert!(apply(&process, &[1, 0], &[0; 2], 1, &classes()).is_none());
    }

    #[test]
    fn test_infix_after_initial_consonant() {
        let position = Environment {
            left: Side {
                items: vec![EnvItem::Class(0)],
                anchored: true,
            },
            right: Side::default(),
        };
        let process = ProcessAllomorph::infix(vec![3, 4], position);
        let (shape, tags) = apply(&process, &[0, 1, 2], &[0, 0, 0], 1, &classes()).expect("applies");
        assert_eq!(shape, vec![0, 3, 4, 1, 2]);
        assert_eq!(tags, vec![0, 1, 1, 0, 0]);
        assert_eq!(unapply(&process, &shape, &classes()), vec![vec![0, 1, 2]]);
    }
}
