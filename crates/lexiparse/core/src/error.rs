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

//! Analyzer errors
//!
//! Word-level failures are never errors: they travel as
//! [`AnalysisResult::error`](crate::AnalysisResult::error).

use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Failed to write grammar diagnostics: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode grammar diagnostics: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No grammar has been compiled")]
    MissingGrammar,

    #[error("Unknown analyzer '{0}' (expected 'unification' or 'segmenting')")]
    UnknownAnalyzer(String),
}
