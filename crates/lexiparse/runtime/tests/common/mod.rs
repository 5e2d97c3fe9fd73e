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

#![allow(dead_code)]

use lexidb_core::{ImportedModel, LexiconStore, ModelDocument};
use lexiparse_runtime::ParserEvent;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

pub const WAIT: Duration = Duration::from_secs(10);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Nouns `cat` and `bus` with an optional plural `-s`
pub fn model(wordforms: &[&str]) -> (Arc<LexiconStore>, ImportedModel) {
    init_tracing();
    let document = serde_json::json!({
        "phonemes": "abcdegiklmnoprstuxyz".chars().map(|c| serde_json::json!({ "name": c.to_string() })).collect::<Vec<_>>(),
        "parts_of_speech": [
            { "abbr": "n", "slots": [{ "name": "NUM", "optional": true }], "templates": [{ "name": "noun", "suffix_slots": ["NUM"] }] }
        ],
        "entries": [
            { "key": "cat", "forms": [{ "form": "cat", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
            { "key": "bus", "forms": [{ "form": "bus", "type": "stem" }], "msas": [{ "kind": "stem", "pos": "n" }] },
            { "key": "PL", "forms": [{ "form": "-s", "type": "suffix" }], "msas": [{ "kind": "infl", "pos": "n", "slots": ["NUM"] }] }
        ],
        "wordforms": wordforms
    });
    let store = Arc::new(LexiconStore::new());
    let imported = ModelDocument::from_value(document).expect("document").import(&store).expect("import");
    (store, imported)
}

/// Poll `events` until `matches` accepts one, collecting everything seen on the way
pub fn wait_for(events: &mut broadcast::Receiver<ParserEvent>, matches: impl Fn(&ParserEvent) -> bool) -> Vec<ParserEvent> {
    let deadline = Instant::now() + WAIT;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        match events.try_recv() {
            Ok(event) => {
                let done = matches(&event);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(broadcast::error::TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(5)),
            Err(err) => panic!("event stream failed: {err}"),
        }
    }
    panic!("timed out waiting for event; saw {seen:?}");
}

/// Poll `condition` until it holds
pub fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn drain(events: &mut broadcast::Receiver<ParserEvent>) -> Vec<ParserEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}
