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

//! # LexiDB Core
//!
//! In-memory linguistic store used by the Lexiparse analysis subsystem.
//!
//! The store is an arena of records addressed by stable keys. The
//! grammar-relevant part (the [`LinguisticModel`]) is shared copy-on-write so
//! compiles can work on a [`ModelSnapshot`] while edits continue; the corpus
//! part holds wordforms and the analyses filed against them.

pub mod corpus;
pub mod document;
pub mod error;
pub mod ids;
pub mod model;
pub mod record;
pub mod store;

pub use corpus::{Agent, Checksum, Corpus, Opinion, ProblemMarker, StoredAnalysis, StoredSegment, TextReference, Wordform};
pub use document::{ImportedModel, ModelDocument};
pub use error::{StoreError, StoreResult};
pub use ids::*;
pub use model::*;
pub use record::{Record, Tables};
pub use store::{ChangeKind, LexiconStore, Mutation, MutationCallback, StoreView, Subscription, Transaction};
