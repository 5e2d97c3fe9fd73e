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

//! Analysis results and their checksums

use lexidb_core::{AllomorphId, Checksum, InflTypeId, MsaId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

/// Word text in canonical decomposed form with collapsed whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedWord(String);

impl NormalizedWord {
    pub fn new(text: &str) -> Self {
        let decomposed: String = text.nfd().collect();
        Self(decomposed.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_uppercase(&self) -> bool {
        self.0.chars().any(char::is_uppercase)
    }

    pub fn to_lowercase(&self) -> Self {
        Self::new(&self.0.to_lowercase())
    }
}

impl fmt::Display for NormalizedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedWord {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// One morph of a candidate: the form that matched and the analysis it realizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MorphSegment {
    pub form: AllomorphId,
    pub msa: MsaId,
    pub infl_type: Option<InflTypeId>,
}

/// Segmentation of a word into morphs, in surface order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnalysisCandidate {
    pub segments: Vec<MorphSegment>,
}

impl AnalysisCandidate {
    pub fn new(segments: Vec<MorphSegment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Outcome of analyzing one word
///
/// Equality and the checksum cover the candidates and the error message;
/// the elapsed time never contributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub candidates: Vec<AnalysisCandidate>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl AnalysisResult {
    pub fn new(candidates: Vec<AnalysisCandidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// BLAKE3 digest of the bincode encoding of candidates and error
    pub fn checksum(&self) -> Checksum {
        let payload = (&self.candidates, &self.error);
        let digest = match bincode::serde::encode_to_vec(payload, bincode::config::standard()) {
            Ok(bytes) => blake3::hash(&bytes),
            Err(err) => {
                warn!(error = %err, "falling back to debug encoding for checksum");
                blake3::hash(format!("{payload:?}").as_bytes())
            }
        };
        *digest.as_bytes()
    }
}

impl PartialEq for AnalysisResult {
    fn eq(&self, other: &Self) -> bool {
        self.candidates == other.candidates && self.error == other.error
    }
}

impl Eq for AnalysisResult {}
