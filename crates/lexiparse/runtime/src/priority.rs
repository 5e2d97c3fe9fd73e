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

//! Work priorities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Priority levels, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserPriority {
    RebuildGrammar = 0,
    Interactive = 1,
    High = 2,
    Medium = 3,
    Low = 4,
}

impl ParserPriority {
    pub const ALL: [ParserPriority; 5] = [Self::RebuildGrammar, Self::Interactive, Self::High, Self::Medium, Self::Low];

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RebuildGrammar => "rebuild_grammar",
            Self::Interactive => "interactive",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Levels that may carry wordform updates
    pub fn is_update_level(&self) -> bool {
        matches!(self, Self::High | Self::Medium | Self::Low)
    }

    /// Levels counted by the idle check
    pub fn counts_toward_idle(&self) -> bool {
        *self != Self::RebuildGrammar
    }
}

impl fmt::Display for ParserPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown priority '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_matches_urgency() {
        let mut levels = vec![ParserPriority::Low, ParserPriority::High, ParserPriority::RebuildGrammar, ParserPriority::Medium];
        levels.sort();
        assert_eq!(levels, vec![ParserPriority::RebuildGrammar, ParserPriority::High, ParserPriority::Medium, ParserPriority::Low]);
        assert_eq!(ParserPriority::Interactive.as_u8(), 1);
    }

    #[test]
    fn test_parse_round_trip() {
        for priority in ParserPriority::ALL {
            assert_eq!(priority.to_string().parse::<ParserPriority>(), Ok(priority));
        }
        assert!("urgent".parse::<ParserPriority>().is_err());
    }
}
