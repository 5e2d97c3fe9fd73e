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

//! `lexiparse parse`: file analyses for every wordform of a model

use super::{ModelArgs, next_event, render_morph};
use clap::Args;
use lexidb_core::{Agent, Opinion, StoredAnalysis, StoredSegment, Wordform, WordformId};
use lexiparse_core::MorphSegment;
use lexiparse_runtime::{FilingOutcome, ParserEvent, ParserPriority, ParserScheduler, ThreadIdleHost};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub struct ParseArgs {
    #[command(flatten)]
    pub input: ModelArgs,
}

fn opinion(analysis: &StoredAnalysis, agent: Agent) -> &'static str {
    match analysis.opinion(agent) {
        Opinion::Neutral => "neutral",
        Opinion::Approves => "approves",
        Opinion::Disapproves => "disapproves",
    }
}

fn morph(segment: &StoredSegment) -> MorphSegment {
    MorphSegment {
        form: segment.form,
        msa: segment.msa,
        infl_type: segment.infl_type,
    }
}

pub fn run_parse(args: ParseArgs) -> anyhow::Result<()> {
    let (store, model) = args.input.load_model()?;
    let config = args.input.load_config()?;
    let idle = Arc::new(ThreadIdleHost::spawn()?);
    let scheduler = ParserScheduler::start(Arc::clone(&store), &config, idle)?;
    let mut events = scheduler.subscribe();

    let wordforms: Vec<WordformId> = model.wordforms.values().copied().collect();
    let batch = scheduler.schedule_batch(&wordforms, ParserPriority::Low, true)?;

    let mut applied = 0usize;
    loop {
        match next_event(&mut events)? {
            ParserEvent::WordformUpdated {
                outcome: FilingOutcome::Applied, ..
            } => applied += 1,
            ParserEvent::BatchComplete(id) if Some(id) == batch => break,
            ParserEvent::UnhandledWorkerError(failure) => eprintln!("{failure}"),
            _ => {}
        }
    }
    info!(wordforms = wordforms.len(), applied, "batch filed");

    store.read(|view| {
        for (form, id) in &model.wordforms {
            println!("{form}");
            let Some(wordform) = view.get::<Wordform>(*id) else {
                continue;
            };
            for problem in view.corpus().problems_for(*id) {
                println!("  problem: {}", problem.message);
            }
            if wordform.analyses.is_empty() && view.corpus().problems_for(*id).next().is_none() {
                println!("  (no analyses)");
            }
            for analysis in wordform.analyses.iter().filter_map(|a| view.get::<StoredAnalysis>(*a)) {
                let morphs: Vec<String> = analysis.segments.iter().map(|s| render_morph(view, &morph(s))).collect();
                println!(
                    "  {} [machine {}, human {}]",
                    morphs.join(" "),
                    opinion(analysis, Agent::Machine),
                    opinion(analysis, Agent::Human)
                );
            }
        }
    });
    Ok(())
}
