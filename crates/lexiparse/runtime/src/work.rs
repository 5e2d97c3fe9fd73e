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

//! Units of scheduled work

use crate::priority::ParserPriority;
use lexidb_core::{MsaId, WordformId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Handle of a tracked batch of wordform updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Recompile the grammar if stale, or unconditionally when forced
    Rebuild { force: bool },
    /// Analyze a word typed by a user and report the result directly
    Interactive { word: String, trace: bool, morph_filter: BTreeSet<MsaId> },
    /// Analyze a stored wordform and file the result
    Update {
        wordform: WordformId,
        priority: ParserPriority,
        batch: Option<BatchId>,
    },
}

impl WorkItem {
    pub fn priority(&self) -> ParserPriority {
        match self {
            Self::Rebuild { .. } => ParserPriority::RebuildGrammar,
            Self::Interactive { .. } => ParserPriority::Interactive,
            Self::Update { priority, .. } => *priority,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rebuild { force: true } => f.write_str("reload grammar"),
            Self::Rebuild { force: false } => f.write_str("rebuild grammar"),
            Self::Interactive { word, .. } => write!(f, "try word '{word}'"),
            Self::Update { wordform, priority, .. } => write!(f, "update wordform {wordform} ({priority})"),
        }
    }
}
