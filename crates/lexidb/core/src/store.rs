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

//! In-memory linguistic store
//!
//! # Concurrency
//! All table access goes through one `parking_lot::Mutex`. A transaction
//! ([`LexiconStore::run_exclusive`]) holds it for the duration of its body;
//! mutation notifications are delivered afterwards, outside the lock, so
//! subscribers may read the store from their callbacks.

use crate::corpus::Corpus;
use crate::ids::{ObjectId, ObjectKind};
use crate::model::{LinguisticModel, ModelSnapshot};
use crate::record::{Record, Tables};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Descriptor of one committed change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub change: ChangeKind,
}

pub type MutationCallback = Arc<dyn Fn(&Mutation) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<u64, MutationCallback>>,
}

impl Subscribers {
    fn notify(&self, mutations: &[Mutation]) {
        let callbacks: Vec<MutationCallback> = self.callbacks.lock().values().cloned().collect();
        for mutation in mutations {
            for callback in &callbacks {
                callback(mutation);
            }
        }
    }
}

/// Registration on the mutation feed; unsubscribes when dropped
#[must_use = "dropping a subscription unsubscribes it immediately"]
pub struct Subscription {
    registry: Weak<Subscribers>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe explicitly
    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.callbacks.lock().remove(&self.id);
            debug!(subscription = self.id, "mutation subscription closed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    tables: Tables,
    registry: HashMap<ObjectId, ObjectKind>,
    next_id: u64,
    version: u64,
}

/// Arena of linguistic objects addressed by stable keys
#[derive(Default)]
pub struct LexiconStore {
    state: Mutex<StoreState>,
    subscribers: Arc<Subscribers>,
}

impl LexiconStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Immutable view of the current grammar-relevant model
    pub fn snapshot(&self) -> ModelSnapshot {
        let state = self.state.lock();
        ModelSnapshot::new(Arc::clone(&state.tables.model), state.version)
    }

    /// Register a callback invoked for every committed mutation
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Mutation) + Send + Sync + 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.callbacks.lock().insert(id, Arc::new(callback));
        Subscription {
            registry: Arc::downgrade(&self.subscribers),
            id,
        }
    }

    /// Run `body` with exclusive access to the store
    ///
    /// Mutations made by the body are announced to subscribers once the
    /// exclusive section has ended.
    pub fn run_exclusive<R>(&self, body: impl FnOnce(&mut Transaction<'_>) -> R) -> R {
        let (result, mutations) = {
            let mut state = self.state.lock();
            let mut txn = Transaction {
                state: &mut *state,
                mutations: Vec::new(),
            };
            let result = body(&mut txn);
            let mutations = txn.mutations;
            if !mutations.is_empty() {
                state.version += 1;
            }
            (result, mutations)
        };

        if !mutations.is_empty() {
            self.subscribers.notify(&mutations);
        }
        result
    }

    /// Run `body` against a consistent read-only view
    pub fn read<R>(&self, body: impl FnOnce(&StoreView<'_>) -> R) -> R {
        let state = self.state.lock();
        body(&StoreView { state: &*state })
    }

    pub fn is_valid(&self, id: impl Into<ObjectId>) -> bool {
        self.state.lock().registry.contains_key(&id.into())
    }

    /// Clone of a single record
    pub fn get<R: Record>(&self, id: R::Id) -> Option<R> {
        self.read(|view| view.get::<R>(id).cloned())
    }

    /// Number of committed transactions that changed something
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }
}

impl std::fmt::Debug for LexiconStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LexiconStore")
            .field("objects", &state.registry.len())
            .field("version", &state.version)
            .finish()
    }
}

/// Read-only access to the store tables
pub struct StoreView<'a> {
    state: &'a StoreState,
}

impl<'a> StoreView<'a> {
    pub fn get<R: Record>(&self, id: R::Id) -> Option<&'a R> {
        R::table(&self.state.tables).get(&id)
    }

    pub fn iter<R: Record>(&self) -> impl Iterator<Item = &'a R> + 'a {
        R::table(&self.state.tables).values()
    }

    pub fn is_valid(&self, id: impl Into<ObjectId>) -> bool {
        self.state.registry.contains_key(&id.into())
    }

    pub fn kind_of(&self, id: impl Into<ObjectId>) -> Option<ObjectKind> {
        self.state.registry.get(&id.into()).copied()
    }

    pub fn model(&self) -> &'a LinguisticModel {
        &self.state.tables.model
    }

    pub fn corpus(&self) -> &'a Corpus {
        &self.state.tables.corpus
    }
}

/// Exclusive, mutating access to the store
pub struct Transaction<'a> {
    state: &'a mut StoreState,
    mutations: Vec<Mutation>,
}

impl Transaction<'_> {
    pub fn view(&self) -> StoreView<'_> {
        StoreView { state: &*self.state }
    }

    pub fn get<R: Record>(&self, id: R::Id) -> Option<&R> {
        R::table(&self.state.tables).get(&id)
    }

    pub fn iter<R: Record>(&self) -> impl Iterator<Item = &R> {
        R::table(&self.state.tables).values()
    }

    pub fn is_valid(&self, id: impl Into<ObjectId>) -> bool {
        self.state.registry.contains_key(&id.into())
    }

    pub fn model(&self) -> &LinguisticModel {
        &self.state.tables.model
    }

    pub fn corpus(&self) -> &Corpus {
        &self.state.tables.corpus
    }

    /// Allocate an id and insert the record built for it
    pub fn insert<R: Record>(&mut self, build: impl FnOnce(R::Id) -> R) -> R::Id {
        self.state.next_id += 1;
        let object = ObjectId(self.state.next_id);
        let id = R::Id::from(object);
        let record = build(id);
        R::table_mut(&mut self.state.tables).insert(id, record);
        self.state.registry.insert(object, R::KIND);
        self.record(object, R::KIND, ChangeKind::Created);
        id
    }

    /// Apply `change` to an existing record; returns false when it does not exist
    pub fn update<R: Record>(&mut self, id: R::Id, change: impl FnOnce(&mut R)) -> bool {
        let Some(record) = R::table_mut(&mut self.state.tables).get_mut(&id) else {
            return false;
        };
        change(record);
        self.record(id.into(), R::KIND, ChangeKind::Modified);
        true
    }

    pub fn remove<R: Record>(&mut self, id: R::Id) -> Option<R> {
        let removed = R::table_mut(&mut self.state.tables).remove(&id)?;
        self.state.registry.remove(&id.into());
        self.record(id.into(), R::KIND, ChangeKind::Deleted);
        Some(removed)
    }

    fn record(&mut self, id: ObjectId, kind: ObjectKind, change: ChangeKind) {
        self.mutations.push(Mutation { id, kind, change });
    }
}
