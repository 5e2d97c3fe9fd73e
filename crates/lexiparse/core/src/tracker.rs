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

//! Grammar staleness tracking

use lexidb_core::{LexiconStore, Mutation, ObjectKind, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Whether a change to objects of `kind` can alter the compiled grammar
///
/// Only the kinds the compiler reads count; a kind added to the store stays
/// irrelevant until it is listed here.
pub fn is_grammar_relevant(kind: ObjectKind) -> bool {
    matches!(
        kind,
        ObjectKind::FeatureDefn
            | ObjectKind::Phoneme
            | ObjectKind::BoundaryMarker
            | ObjectKind::NaturalClass
            | ObjectKind::PhonRule
            | ObjectKind::PartOfSpeech
            | ObjectKind::InflectionClass
            | ObjectKind::AffixSlot
            | ObjectKind::AffixTemplate
            | ObjectKind::LexEntry
            | ObjectKind::Allomorph
            | ObjectKind::LexSense
            | ObjectKind::Msa
            | ObjectKind::InflectionType
            | ObjectKind::MprFeature
            | ObjectKind::MprGroup
            | ObjectKind::Prohibition
    )
}

/// Sticky dirty flag raised by grammar-relevant store mutations
///
/// The flag starts raised so the first check always triggers a compile. It is
/// shared between the thread delivering mutations and the parser worker.
#[derive(Debug)]
pub struct ChangeTracker {
    dirty: Arc<Mutex<bool>>,
    subscription: Option<Subscription>,
}

impl ChangeTracker {
    /// Track mutations of `store` for as long as the tracker lives
    pub fn attach(store: &LexiconStore) -> Self {
        let dirty = Arc::new(Mutex::new(true));
        let flag = Arc::clone(&dirty);
        let subscription = store.subscribe(move |mutation: &Mutation| {
            if is_grammar_relevant(mutation.kind) {
                *flag.lock() = true;
            }
        });
        Self {
            dirty,
            subscription: Some(subscription),
        }
    }

    /// Tracker fed only through [`ChangeTracker::notify`]
    pub fn detached() -> Self {
        Self {
            dirty: Arc::new(Mutex::new(true)),
            subscription: None,
        }
    }

    pub fn notify(&self, mutation: &Mutation) {
        if is_grammar_relevant(mutation.kind) {
            debug!(id = %mutation.id, kind = %mutation.kind, "grammar-relevant mutation");
            *self.dirty.lock() = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        *self.dirty.lock()
    }

    /// Clear the flag, reporting whether it was set
    pub fn reset_if_dirty(&self) -> bool {
        std::mem::replace(&mut *self.dirty.lock(), false)
    }

    pub fn mark_dirty(&self) {
        *self.dirty.lock() = true;
    }

    /// Stop listening to the store; the flag keeps its current value
    pub fn close(&mut self) {
        self.subscription = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexidb_core::{ChangeKind, ObjectId, Wordform};

    fn mutation(kind: ObjectKind) -> Mutation {
        Mutation {
            id: ObjectId(1),
            kind,
            change: ChangeKind::Modified,
        }
    }

    #[test]
    fn test_starts_dirty_and_resets_once() {
        let tracker = ChangeTracker::detached();
        assert!(tracker.is_dirty());
        assert!(tracker.reset_if_dirty());
        assert!(!tracker.reset_if_dirty());
        assert!(!tracker.is_dirty());
    }

    #[test]
    fn test_corpus_kinds_are_not_grammar() {
        for kind in [ObjectKind::Wordform, ObjectKind::StoredAnalysis, ObjectKind::ProblemMarker, ObjectKind::TextReference] {
            assert!(!is_grammar_relevant(kind), "{kind}");
        }
        for kind in [ObjectKind::Phoneme, ObjectKind::PhonRule, ObjectKind::AffixTemplate, ObjectKind::Allomorph, ObjectKind::Msa, ObjectKind::Prohibition] {
            assert!(is_grammar_relevant(kind), "{kind}");
        }
    }

    #[test]
    fn test_only_grammar_kinds_raise_the_flag() {
        let tracker = ChangeTracker::detached();
        tracker.reset_if_dirty();

        tracker.notify(&mutation(ObjectKind::StoredAnalysis));
        tracker.notify(&mutation(ObjectKind::Wordform));
        assert!(!tracker.is_dirty());

        tracker.notify(&mutation(ObjectKind::LexSense));
        assert!(tracker.is_dirty());
    }

    #[test]
    fn test_attached_tracker_follows_the_store() {
        let store = LexiconStore::new();
        let mut tracker = ChangeTracker::attach(&store);
        tracker.reset_if_dirty();

        store.run_exclusive(|txn| {
            txn.insert(|id| Wordform {
                id,
                form: "x".into(),
                checksum: None,
                analyses: Vec::new(),
            })
        });
        assert!(!tracker.is_dirty());

        store.run_exclusive(|txn| {
            txn.insert(|id| lexidb_core::MprGroup {
                id,
                name: "g".into(),
                match_all: true,
            })
        });
        assert!(tracker.is_dirty());

        tracker.reset_if_dirty();
        tracker.close();
        store.run_exclusive(|txn| {
            txn.insert(|id| lexidb_core::MprGroup {
                id,
                name: "h".into(),
                match_all: false,
            })
        });
        assert!(!tracker.is_dirty());
    }
}
