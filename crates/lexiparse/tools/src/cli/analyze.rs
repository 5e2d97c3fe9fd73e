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

//! `lexiparse analyze`: interactive analyses through the scheduler

use super::{ModelArgs, next_event, render_morph};
use clap::Args;
use lexiparse_core::{AnalysisResult, TraceTree};
use lexiparse_runtime::{ManualIdleHost, ParserEvent, ParserScheduler};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: ModelArgs,

    /// Print the trace of each analysis as JSON
    #[arg(short, long)]
    pub trace: bool,

    /// Words to analyze
    #[arg(value_name = "WORD", required = true)]
    pub words: Vec<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let (store, _model) = args.input.load_model()?;
    let config = args.input.load_config()?;
    let scheduler = ParserScheduler::start(Arc::clone(&store), &config, Arc::new(ManualIdleHost::new()))?;
    let mut events = scheduler.subscribe();

    for word in &args.words {
        scheduler.schedule_interactive_analyze(word.as_str(), args.trace, BTreeSet::new())?;
    }

    let mut remaining = args.words.len();
    while remaining > 0 {
        match next_event(&mut events)? {
            ParserEvent::TryAWordResult { word, result, trace } => {
                remaining -= 1;
                print_result(&store, &word, &result, trace.as_ref())?;
            }
            ParserEvent::UnhandledWorkerError(failure) => {
                remaining = remaining.saturating_sub(1);
                eprintln!("{failure}");
            }
            _ => {}
        }
    }
    Ok(())
}

fn print_result(store: &lexidb_core::LexiconStore, word: &str, result: &AnalysisResult, trace: Option<&TraceTree>) -> anyhow::Result<()> {
    println!("{word}");
    if let Some(error) = &result.error {
        println!("  error: {error}");
    } else if result.candidates.is_empty() {
        println!("  (no analyses)");
    } else {
        store.read(|view| {
            for (i, candidate) in result.candidates.iter().enumerate() {
                let morphs: Vec<String> = candidate.segments.iter().map(|s| render_morph(view, s)).collect();
                println!("  {}. {}", i + 1, morphs.join(" "));
            }
        });
    }
    if let Some(trace) = trace {
        println!("{}", serde_json::to_string_pretty(trace)?);
    }
    Ok(())
}
