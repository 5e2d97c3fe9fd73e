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

//! `lexiparse check`: compile a model and report compile errors

use super::ModelArgs;
use anyhow::bail;
use clap::Args;
use lexiparse_compiler::{CompileError, GrammarCompiler};

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: ModelArgs,

    /// Print the grammar summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_check(args: CheckArgs) -> anyhow::Result<()> {
    let (store, _model) = args.input.load_model()?;
    let config = args.input.load_config()?;

    let compiler = GrammarCompiler::new(config.compiler_config());
    let mut errors: Vec<CompileError> = Vec::new();
    let (grammar, stats) = compiler.compile_with_stats(&store.snapshot(), &mut errors);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&grammar.summary())?);
    } else {
        let summary = grammar.summary();
        println!("Lexical entries: {}", summary.lexical_entries);
        println!("Morphological rules: {}", summary.rules);
        println!("Affix templates: {}", summary.templates);
        println!("Phonological rules: {}", summary.phon_rules);
        println!("Compiled in {:?}", stats.total_time());
    }

    for error in &errors {
        println!("error: {error}");
    }
    if !errors.is_empty() {
        bail!("{} compile error(s)", errors.len());
    }
    Ok(())
}
