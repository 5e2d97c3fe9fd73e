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

//! Asynchronous parsing runtime
//!
//! A five-level priority queue feeds a single worker thread that owns the
//! analyzer. Results for stored wordforms are filed back into the store on
//! the host's idle callback; everything else is reported on a broadcast
//! event stream.

pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod filer;
pub mod idle;
pub mod priority;
pub mod queue;
pub mod scheduler;
pub mod work;
mod worker;

pub use completion::Completions;
pub use config::{FilingPolicy, ParserConfig};
pub use error::{ParserError, ParserResult, WorkerFailure};
pub use events::{EventBus, FilingOutcome, ParserEvent, TaskStatus};
pub use filer::ResultFiler;
pub use idle::{IdleHost, IdleTask, ManualIdleHost, ThreadIdleHost};
pub use priority::ParserPriority;
pub use queue::{Next, WorkQueue};
pub use scheduler::ParserScheduler;
pub use work::{BatchId, WorkItem};
