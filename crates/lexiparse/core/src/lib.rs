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

//! Morphological analysis over a compiled grammar
//!
//! This crate holds the [`Analyzer`] contract, its two engines and the
//! pieces they share: word normalization, results and their checksums,
//! grammar staleness tracking and structured traces.

pub mod analysis;
pub mod analyzer;
pub mod engine;
pub mod error;
pub mod trace;
pub mod tracker;

pub use analysis::{AnalysisCandidate, AnalysisResult, MorphSegment, NormalizedWord};
pub use analyzer::{Analyzer, AnalyzerEngine, AnalyzerKind, EngineSettings, GRAMMAR_SUMMARY_FILE, GrammarHost, Parser, SegmentingParser, UnificationParser};
pub use error::{AnalyzerError, AnalyzerResult};
pub use trace::{TraceSelector, TraceStep, TraceTree};
pub use tracker::{ChangeTracker, is_grammar_relevant};
