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

//! Subcommand implementations and the helpers they share

pub mod analyze;
pub mod check;
pub mod parse;

use anyhow::{Context, bail};
use clap::Args;
use lexidb_core::{Allomorph, ImportedModel, LexEntry, LexSense, LexiconStore, ModelDocument, StoreView};
use lexiparse_core::MorphSegment;
use lexiparse_runtime::{ParserConfig, ParserEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Model and configuration inputs common to every subcommand
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// JSON model document
    #[arg(short, long, value_name = "MODEL_FILE")]
    pub model: PathBuf,

    /// JSON parser configuration; defaults apply when omitted
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

impl ModelArgs {
    pub fn load_model(&self) -> anyhow::Result<(Arc<LexiconStore>, ImportedModel)> {
        let document = ModelDocument::from_file(&self.model).with_context(|| format!("reading model {}", self.model.display()))?;
        let store = Arc::new(LexiconStore::new());
        let imported = document.import(&store).with_context(|| format!("importing model {}", self.model.display()))?;
        Ok((store, imported))
    }

    pub fn load_config(&self) -> anyhow::Result<ParserConfig> {
        let config = match &self.config {
            Some(path) => ParserConfig::from_file(path).with_context(|| format!("reading config {}", path.display()))?,
            None => ParserConfig::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}

/// `form:gloss` for one morph, falling back to the entry citation
pub fn render_morph(view: &StoreView<'_>, segment: &MorphSegment) -> String {
    let Some(allomorph) = view.get::<Allomorph>(segment.form) else {
        return "?".to_string();
    };
    let label = view.get::<LexEntry>(allomorph.entry).map(|entry| {
        let senses: Vec<&LexSense> = entry.senses.iter().filter_map(|s| view.get::<LexSense>(*s)).collect();
        let sense = senses.iter().copied().find(|s| s.msa == Some(segment.msa)).or(senses.first().copied());
        sense.map_or(entry.citation.as_str(), |s| s.gloss.as_str())
    });
    format!("{}:{}", allomorph.form, label.unwrap_or("?"))
}

/// Block until the next event, skipping over lag
pub fn next_event(events: &mut broadcast::Receiver<ParserEvent>) -> anyhow::Result<ParserEvent> {
    loop {
        match events.blocking_recv() {
            Ok(event) => return Ok(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => warn!(missed, "event stream lagged"),
            Err(broadcast::error::RecvError::Closed) => bail!("parser event stream closed"),
        }
    }
}
