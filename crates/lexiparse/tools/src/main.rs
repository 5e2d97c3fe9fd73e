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

//! Lexiparse CLI
//!
//! Main entry point for the `lexiparse` command-line interface.

use clap::{Parser, Subcommand};
use lexiparse_tools::{AnalyzeArgs, CheckArgs, ParseArgs, run_analyze, run_check, run_parse};

#[derive(Parser)]
#[command(name = "lexiparse")]
#[command(about = "Lexiparse - morphological parsing for lexicon models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model and report compile errors
    Check(CheckArgs),
    /// Analyze words against a model
    Analyze(AnalyzeArgs),
    /// File analyses for every wordform in a model
    Parse(ParseArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Analyze(args) => run_analyze(args),
        Commands::Parse(args) => run_parse(args),
    }
}
