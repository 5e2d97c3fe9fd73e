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

//! The analyzer contract and its interchangeable engines
//!
//! An [`Analyzer`] owns the compiled grammar it runs. The grammar is held
//! behind an `Arc` and replaced as a whole on rebuild; it is never mutated,
//! so a caller holding the previous grammar keeps a consistent view until it
//! drops it.

use crate::analysis::{AnalysisResult, NormalizedWord};
use crate::engine::{self, SegmentingStrategy, Strategy, UnificationStrategy};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::trace::{TraceSelector, TraceTree};
use crate::tracker::ChangeTracker;
use lexidb_core::LexiconStore;
use lexiparse_compiler::{CompileErrorSink, CompileStats, CompiledGrammar, GrammarCompiler, GrammarSummary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// File a rebuild writes into the data directory
pub const GRAMMAR_SUMMARY_FILE: &str = "grammar-summary.json";

pub trait Analyzer: Send {
    /// True iff a grammar is installed and no rebuild is pending
    fn is_up_to_date(&self) -> bool;

    /// Compile the current store model and install it in place of the previous grammar
    fn rebuild(&mut self, sink: &mut dyn CompileErrorSink) -> AnalyzerResult<CompileStats>;

    /// Mark the analyzer stale without rebuilding
    fn reset(&mut self);

    fn analyze(&self, word: &NormalizedWord) -> AnalysisResult;

    fn analyze_with_trace(&self, word: &NormalizedWord, selector: &TraceSelector) -> (AnalysisResult, TraceTree);

    /// The installed grammar, if any
    fn grammar(&self) -> Option<Arc<CompiledGrammar>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    #[default]
    Unification,
    Segmenting,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unification => UnificationStrategy::NAME,
            Self::Segmenting => SegmentingStrategy::NAME,
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyzerKind {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unification" => Ok(Self::Unification),
            "segmenting" => Ok(Self::Segmenting),
            other => Err(AnalyzerError::UnknownAnalyzer(other.to_string())),
        }
    }
}

/// Engine limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// More candidates than this make the result an error
    pub max_analyses: usize,
    /// Cap on underlying forms produced by phonological unapplication
    pub max_unapplications: usize,
    /// Deepest affix nesting explored
    pub max_affix_depth: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_analyses: 100,
            max_unapplications: 256,
            max_affix_depth: 8,
        }
    }
}

/// Grammar lifecycle shared by every engine: staleness, compilation, installation
pub struct GrammarHost {
    store: Arc<LexiconStore>,
    tracker: ChangeTracker,
    compiler: GrammarCompiler,
    grammar: Option<Arc<CompiledGrammar>>,
    forced: bool,
    data_dir: Option<PathBuf>,
}

impl GrammarHost {
    pub fn new(store: Arc<LexiconStore>, compiler: GrammarCompiler) -> Self {
        let tracker = ChangeTracker::attach(&store);
        Self {
            store,
            tracker,
            compiler,
            grammar: None,
            forced: false,
            data_dir: None,
        }
    }

    /// Write a grammar summary into `dir` after every rebuild
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn store(&self) -> &Arc<LexiconStore> {
        &self.store
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn is_up_to_date(&self) -> bool {
        self.grammar.is_some() && !self.forced && !self.tracker.is_dirty()
    }

    fn reset(&mut self) {
        self.forced = true;
    }

    fn rebuild(&mut self, sink: &mut dyn CompileErrorSink) -> AnalyzerResult<CompileStats> {
        // Cleared before the snapshot so edits racing the compile mark the new grammar stale
        let was_dirty = self.tracker.reset_if_dirty();
        self.forced = false;
        let snapshot = self.store.snapshot();
        let (grammar, stats) = self.compiler.compile_with_stats(&snapshot, sink);
        let grammar = Arc::new(grammar);
        info!(
            version = grammar.model_version,
            was_dirty,
            entries = stats.lexical_entries,
            rules = stats.rules,
            errors = stats.errors,
            elapsed_ms = stats.total_time().as_millis() as u64,
            "grammar installed"
        );
        self.grammar = Some(Arc::clone(&grammar));
        if let Some(dir) = &self.data_dir {
            write_summary(dir, &grammar.summary(), &stats)?;
        }
        Ok(stats)
    }
}

impl fmt::Debug for GrammarHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarHost")
            .field("grammar_version", &self.grammar.as_ref().map(|g| g.model_version))
            .field("dirty", &self.tracker.is_dirty())
            .field("forced", &self.forced)
            .finish()
    }
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    grammar: &'a GrammarSummary,
    stats: &'a CompileStats,
}

fn write_summary(dir: &Path, summary: &GrammarSummary, stats: &CompileStats) -> AnalyzerResult<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(GRAMMAR_SUMMARY_FILE);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, &SummaryFile { grammar: summary, stats })?;
    debug!(path = %path.display(), "grammar summary written");
    Ok(())
}

/// An analyzer running one engine strategy over a hosted grammar
#[derive(Debug)]
pub struct Parser<S> {
    host: GrammarHost,
    strategy: S,
    settings: EngineSettings,
}

pub type UnificationParser = Parser<UnificationStrategy>;
pub type SegmentingParser = Parser<SegmentingStrategy>;

impl<S: Strategy> Parser<S> {
    pub fn new(host: GrammarHost, settings: EngineSettings) -> Self {
        Self {
            host,
            strategy: S::default(),
            settings,
        }
    }

    pub fn host(&self) -> &GrammarHost {
        &self.host
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl<S: Strategy> Analyzer for Parser<S> {
    fn is_up_to_date(&self) -> bool {
        self.host.is_up_to_date()
    }

    fn rebuild(&mut self, sink: &mut dyn CompileErrorSink) -> AnalyzerResult<CompileStats> {
        self.host.rebuild(sink)
    }

    fn reset(&mut self) {
        self.host.reset();
    }

    fn analyze(&self, word: &NormalizedWord) -> AnalysisResult {
        engine::parse(&self.strategy, self.host.grammar.as_deref(), word, &self.settings, None).0
    }

    fn analyze_with_trace(&self, word: &NormalizedWord, selector: &TraceSelector) -> (AnalysisResult, TraceTree) {
        let (result, trace) = engine::parse(&self.strategy, self.host.grammar.as_deref(), word, &self.settings, Some(selector));
        (result, trace.unwrap_or_default())
    }

    fn grammar(&self) -> Option<Arc<CompiledGrammar>> {
        self.host.grammar.clone()
    }
}

/// The closed set of engines, chosen once at construction
#[derive(Debug)]
pub enum AnalyzerEngine {
    Unification(UnificationParser),
    Segmenting(SegmentingParser),
}

impl AnalyzerEngine {
    pub fn new(kind: AnalyzerKind, host: GrammarHost, settings: EngineSettings) -> Self {
        debug!(analyzer = %kind, "constructing analyzer");
        match kind {
            AnalyzerKind::Unification => Self::Unification(Parser::new(host, settings)),
            AnalyzerKind::Segmenting => Self::Segmenting(Parser::new(host, settings)),
        }
    }

    pub fn kind(&self) -> AnalyzerKind {
        match self {
            Self::Unification(_) => AnalyzerKind::Unification,
            Self::Segmenting(_) => AnalyzerKind::Segmenting,
        }
    }

    pub fn host(&self) -> &GrammarHost {
        match self {
            Self::Unification(parser) => parser.host(),
            Self::Segmenting(parser) => parser.host(),
        }
    }

    /// Summary of the installed grammar
    pub fn summary(&self) -> AnalyzerResult<GrammarSummary> {
        self.grammar().map(|g| g.summary()).ok_or(AnalyzerError::MissingGrammar)
    }

    fn as_dyn(&self) -> &dyn Analyzer {
        match self {
            Self::Unification(parser) => parser,
            Self::Segmenting(parser) => parser,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn Analyzer {
        match self {
            Self::Unification(parser) => parser,
            Self::Segmenting(parser) => parser,
        }
    }
}

impl Analyzer for AnalyzerEngine {
    fn is_up_to_date(&self) -> bool {
        self.as_dyn().is_up_to_date()
    }

    fn rebuild(&mut self, sink: &mut dyn CompileErrorSink) -> AnalyzerResult<CompileStats> {
        self.as_dyn_mut().rebuild(sink)
    }

    fn reset(&mut self) {
        self.as_dyn_mut().reset();
    }

    fn analyze(&self, word: &NormalizedWord) -> AnalysisResult {
        self.as_dyn().analyze(word)
    }

    fn analyze_with_trace(&self, word: &NormalizedWord, selector: &TraceSelector) -> (AnalysisResult, TraceTree) {
        self.as_dyn().analyze_with_trace(word, selector)
    }

    fn grammar(&self) -> Option<Arc<CompiledGrammar>> {
        self.as_dyn().grammar()
    }
}
