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

//! Full engine: phonology, non-concatenative processes and feature unification

use super::{Strategy, phonology, process};
use crate::analyzer::EngineSettings;
use crate::trace::{TraceStep, Tracer};
use lexiparse_compiler::{CompiledClass, CompiledGrammar, ProcessAllomorph, SegId, Shape};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnificationStrategy;

impl Strategy for UnificationStrategy {
    const NAME: &'static str = "unification";

    fn applies_phonology(&self) -> bool {
        true
    }

    fn underlying_forms(&self, grammar: &CompiledGrammar, surface: &[SegId], settings: &EngineSettings, tracer: &mut Tracer) -> Result<Vec<Shape>, String> {
        let forms = phonology::unapply_all(grammar, surface, settings.max_unapplications)?;
        if forms.len() > 1 {
            tracer.step(|| TraceStep::PhonologyUnapplied {
                forms: forms.iter().map(|f| grammar.symbols.render(f)).collect(),
            });
        }
        Ok(forms)
    }

    fn peel(&self, process: &ProcessAllomorph, form: &[SegId], classes: &[CompiledClass]) -> Vec<Shape> {
        process::unapply(process, form, classes)
    }
}
