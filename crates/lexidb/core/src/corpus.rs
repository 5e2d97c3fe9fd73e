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

//! Corpus records: wordforms and the analyses filed against them

use crate::ids::{AllomorphId, AnalysisId, InflTypeId, MsaId, ProblemId, TextRefId, WordformId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Digest of the last analysis result filed for a wordform
pub type Checksum = [u8; 32];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wordform {
    pub id: WordformId,
    pub form: String,
    pub checksum: Option<Checksum>,
    pub analyses: Vec<AnalysisId>,
}

/// Who expressed an opinion on an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Agent {
    Machine,
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Opinion {
    #[default]
    Neutral,
    Approves,
    Disapproves,
}

/// One morph of a stored analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredSegment {
    pub form: AllomorphId,
    pub msa: MsaId,
    pub infl_type: Option<InflTypeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: AnalysisId,
    pub wordform: WordformId,
    pub segments: Vec<StoredSegment>,
    pub machine_opinion: Opinion,
    pub human_opinion: Opinion,
}

impl StoredAnalysis {
    pub fn opinion(&self, agent: Agent) -> Opinion {
        match agent {
            Agent::Machine => self.machine_opinion,
            Agent::Human => self.human_opinion,
        }
    }

    pub fn set_opinion(&mut self, agent: Agent, opinion: Opinion) {
        match agent {
            Agent::Machine => self.machine_opinion = opinion,
            Agent::Human => self.human_opinion = opinion,
        }
    }
}

/// Diagnostic attached to a wordform by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemMarker {
    pub id: ProblemId,
    pub target: WordformId,
    pub owner: Agent,
    pub message: String,
}

/// A live use of an analysis in some text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextReference {
    pub id: TextRefId,
    pub analysis: AnalysisId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub wordforms: BTreeMap<WordformId, Wordform>,
    pub analyses: BTreeMap<AnalysisId, StoredAnalysis>,
    pub problems: BTreeMap<ProblemId, ProblemMarker>,
    pub text_refs: BTreeMap<TextRefId, TextReference>,
}

impl Corpus {
    pub fn is_in_use(&self, analysis: AnalysisId) -> bool {
        self.text_refs.values().any(|r| r.analysis == analysis)
    }

    pub fn problems_for(&self, wordform: WordformId) -> impl Iterator<Item = &ProblemMarker> {
        self.problems.values().filter(move |p| p.target == wordform)
    }
}
