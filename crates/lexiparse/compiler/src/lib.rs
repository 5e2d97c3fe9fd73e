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

//! # Lexiparse Compiler
//!
//! Translates a [`ModelSnapshot`](lexidb_core::ModelSnapshot) into a
//! [`CompiledGrammar`]: a symbol table, natural classes, a shape-indexed stem
//! lexicon, affix and clitic rules built from process allomorphs, affix
//! templates, null affixes, ordered phonological rules and co-occurrence
//! constraints.
//!
//! Compilation is a pure function of the snapshot. Items that cannot be
//! translated are reported to a [`CompileErrorSink`] and left out; a model
//! with nothing usable compiles to an empty grammar.

pub mod compiler;
mod constraints;
pub mod environment;
pub mod error;
pub mod features;
pub mod grammar;
mod lexicon;
mod morphology;
mod phonology;
pub mod symbols;

pub use compiler::{CompileStats, CompilerConfig, GrammarCompiler};
pub use environment::{EnvItem, Environment, Side};
pub use error::{CompileError, CompileErrorSink, CompileResult, TracingSink};
pub use features::FeatureStruct;
pub use grammar::*;
pub use symbols::{SegId, Shape, SymbolTable};
