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

//! Parser configuration

use crate::error::{ParserError, ParserResult};
use lexiparse_compiler::CompilerConfig;
use lexiparse_core::{AnalyzerKind, EngineSettings};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// What the result filer may do beyond the rules it always follows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingPolicy {
    /// Delete analyses neutral for both agents and referenced by no text
    pub delete_unused_neutral: bool,
    /// Delete unmatched analyses whose morphs reference removed objects
    pub purge_invalid: bool,
}

impl Default for FilingPolicy {
    fn default() -> Self {
        Self {
            delete_unused_neutral: true,
            purge_invalid: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Engine constructed at start-up
    pub analyzer: AnalyzerKind,

    /// Directory receiving grammar diagnostics after each rebuild
    pub data_dir: Option<PathBuf>,

    pub max_analyses: usize,

    pub max_unapplications: usize,

    pub max_affix_depth: usize,

    /// Retry capitalized wordforms in lowercase when they get no analysis
    pub lowercase_fallback: bool,

    /// Synthesize null affixes for irregularly inflected variants
    pub null_affixes: bool,

    /// Capacity of the event channel
    pub event_buffer: usize,

    pub filing: FilingPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            analyzer: AnalyzerKind::default(),
            data_dir: None,
            max_analyses: engine.max_analyses,
            max_unapplications: engine.max_unapplications,
            max_affix_depth: engine.max_affix_depth,
            lowercase_fallback: true,
            null_affixes: true,
            event_buffer: 1024,
            filing: FilingPolicy::default(),
        }
    }
}

impl ParserConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> ParserResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LEXIPARSE_ANALYZER`, `LEXIPARSE_DATA_DIR` and `LEXIPARSE_MAX_ANALYSES`
    pub fn with_env_overrides(mut self) -> ParserResult<Self> {
        if let Ok(analyzer) = env::var("LEXIPARSE_ANALYZER") {
            self.analyzer = analyzer.parse()?;
        }
        if let Ok(dir) = env::var("LEXIPARSE_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(max) = env::var("LEXIPARSE_MAX_ANALYSES") {
            self.max_analyses = max.parse().map_err(|_| ParserError::invalid_config(format!("LEXIPARSE_MAX_ANALYSES is not a number: {max}")))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> ParserResult<()> {
        if self.event_buffer == 0 {
            return Err(ParserError::invalid_config("event_buffer must be positive"));
        }
        if self.max_unapplications == 0 {
            return Err(ParserError::invalid_config("max_unapplications must be positive"));
        }
        if self.max_affix_depth == 0 {
            return Err(ParserError::invalid_config("max_affix_depth must be positive"));
        }
        if let Some(dir) = &self.data_dir {
            if dir.is_file() {
                return Err(ParserError::invalid_config(format!("data_dir {} is a file", dir.display())));
            }
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_analyses: self.max_analyses,
            max_unapplications: self.max_unapplications,
            max_affix_depth: self.max_affix_depth,
        }
    }

    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            null_affixes: self.null_affixes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("parser.json");
        std::fs::write(&path, r#"{ "analyzer": "segmenting", "filing": { "delete_unused_neutral": false } }"#).expect("write");

        let config = ParserConfig::from_file(&path).expect("config");
        assert_eq!(config.analyzer, AnalyzerKind::Segmenting);
        assert!(!config.filing.delete_unused_neutral);
        assert!(config.filing.purge_invalid);
        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let config = ParserConfig {
            event_buffer: 0,
            ..ParserConfig::default()
        };
        assert!(matches!(config.validate(), Err(ParserError::InvalidConfig(_))));
        assert!(ParserConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_analyzer_is_rejected() {
        let result: Result<ParserConfig, _> = serde_json::from_str(r#"{ "analyzer": "hermit" }"#);
        assert!(result.is_err());
    }
}
