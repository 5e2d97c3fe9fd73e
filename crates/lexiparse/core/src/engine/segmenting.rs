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

//! Lightweight engine: concatenative prefixes and suffixes only, no phonology

use super::Strategy;
use crate::analyzer::EngineSettings;
use crate::trace::Tracer;
use lexiparse_compiler::{CompiledClass, CompiledGrammar, ProcessAllomorph, SegId, Shape};

#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentingStrategy;

impl Strategy for SegmentingStrategy {
    const NAME: &'static str = "segmenting";

    fn applies_phonology(&self) -> bool {
        false
    }

    fn underlying_forms(&self, _grammar: &CompiledGrammar, surface: &[SegId], _settings: &EngineSettings, _tracer: &mut Tracer) -> Result<Vec<Shape>, String> {
        Ok(vec![surface.to_vec()])
    }

    fn peel(&self, process: &ProcessAllomorph, form: &[SegId], _classes: &[CompiledClass]) -> Vec<Shape> {
        match process.concatenative() {
            Some((true, affix)) if form.len() > affix.len() && form.starts_with(affix) => vec![form[affix.len()..].to_vec()],
            Some((false, affix)) if form.len() > affix.len() && form.ends_with(affix) => vec![form[..form.len() - affix.len()].to_vec()],
            _ => Vec::new(),
        }
    }
}
