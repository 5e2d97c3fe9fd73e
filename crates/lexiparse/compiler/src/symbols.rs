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

//! Phoneme symbol table and shape tokenizing

use crate::features::FeatureStruct;
use lexidb_core::{LinguisticModel, PhonemeId};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

/// Index of a segment in the symbol table
pub type SegId = u16;

/// Tokenized phonological form
pub type Shape = Vec<SegId>;

#[derive(Debug, Clone, Serialize)]
pub struct SegmentDef {
    pub phoneme: PhonemeId,
    pub name: String,
    /// Representation used when rendering shapes
    pub code: String,
    pub features: FeatureStruct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Segment(SegId),
    Boundary,
}

/// Maps graphemic codes to segments by longest match
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    segments: Vec<SegmentDef>,
    /// Sorted by decreasing byte length
    codes: Vec<(String, Symbol)>,
}

impl SymbolTable {
    /// Build the table from the phonemes and boundary markers of a model
    ///
    /// Codes are NFD-normalized so they line up with normalized words.
    /// Phoneme feature structures are filled in by the caller.
    pub fn build(model: &LinguisticModel) -> Self {
        let mut table = Self::default();
        for phoneme in model.phonemes.values() {
            let id = table.segments.len() as SegId;
            let codes: Vec<String> = phoneme.codes.iter().map(|c| c.nfd().collect::<String>()).filter(|c| !c.is_empty()).collect();
            let display = codes.first().cloned().unwrap_or_else(|| phoneme.name.clone());
            table.segments.push(SegmentDef {
                phoneme: phoneme.id,
                name: phoneme.name.clone(),
                code: display,
                features: FeatureStruct::default(),
            });
            for code in codes {
                table.add_code(code, Symbol::Segment(id));
            }
        }
        for boundary in model.boundaries.values() {
            let code: String = boundary.code.nfd().collect();
            if !code.is_empty() {
                table.add_code(code, Symbol::Boundary);
            }
        }
        table.codes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        table
    }

    fn add_code(&mut self, code: String, symbol: Symbol) {
        if !self.codes.iter().any(|(existing, _)| *existing == code) {
            self.codes.push((code, symbol));
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, id: SegId) -> &SegmentDef {
        &self.segments[id as usize]
    }

    pub fn segments(&self) -> impl Iterator<Item = (SegId, &SegmentDef)> {
        self.segments.iter().enumerate().map(|(i, s)| (i as SegId, s))
    }

    pub(crate) fn segment_mut(&mut self, id: SegId) -> &mut SegmentDef {
        &mut self.segments[id as usize]
    }

    /// Tokenize `text` into segments, dropping boundary markers
    ///
    /// On failure returns the byte offset of the first character that matches
    /// no code.
    pub fn tokenize(&self, text: &str) -> Result<Shape, usize> {
        let mut shape = Shape::new();
        let mut offset = 0;
        while offset < text.len() {
            let rest = &text[offset..];
            let (code, symbol) = self.codes.iter().find(|(code, _)| rest.starts_with(code.as_str())).ok_or(offset)?;
            if let Symbol::Segment(id) = symbol {
                shape.push(*id);
            }
            offset += code.len();
        }
        Ok(shape)
    }

    /// Length in bytes of the longest code matching at the start of `text`
    pub(crate) fn match_prefix(&self, text: &str) -> Option<(usize, Option<SegId>)> {
        self.codes.iter().find(|(code, _)| text.starts_with(code.as_str())).map(|(code, symbol)| {
            let seg = match symbol {
                Symbol::Segment(id) => Some(*id),
                Symbol::Boundary => None,
            };
            (code.len(), seg)
        })
    }

    pub fn render(&self, shape: &[SegId]) -> String {
        shape.iter().map(|id| self.segment(*id).code.as_str()).collect()
    }
}
