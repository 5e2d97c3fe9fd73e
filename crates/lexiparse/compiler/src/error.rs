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

//! Per-item compile errors and the sink they are reported to

use lexidb_core::{MorphType, ObjectId};
use thiserror::Error;
use tracing::warn;

pub type CompileResult<T> = Result<T, CompileError>;

/// A single entry, allomorph or rule that could not be translated
///
/// Compilation never stops on one of these; the offending item is left out of
/// the grammar and the error is handed to a [`CompileErrorSink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Invalid phonological shape '{form}' at offset {offset} (owner {owner})")]
    InvalidShape { owner: ObjectId, form: String, offset: usize },

    #[error("Invalid environment '{environment}' at offset {offset}: {reason} (owner {owner})")]
    InvalidEnvironment {
        owner: ObjectId,
        environment: String,
        offset: usize,
        reason: String,
    },

    #[error("Invalid reduplication pattern '{form}': {reason} (owner {owner})")]
    InvalidReduplication { owner: ObjectId, form: String, reason: String },

    #[error("Unsupported morph type {morph_type:?} for '{form}' (owner {owner})")]
    UnsupportedMorphType { owner: ObjectId, form: String, morph_type: MorphType },

    #[error("Unknown value '{value}' for feature '{feature}' (owner {owner})")]
    UnknownFeatureValue { owner: ObjectId, feature: String, value: String },

    #[error("Dangling reference to {target} (owner {owner})")]
    DanglingReference { owner: ObjectId, target: ObjectId },

    #[error("Invalid rule: {reason} (owner {owner})")]
    InvalidRule { owner: ObjectId, reason: String },
}

impl CompileError {
    pub fn invalid_shape(owner: impl Into<ObjectId>, form: impl Into<String>, offset: usize) -> Self {
        Self::InvalidShape {
            owner: owner.into(),
            form: form.into(),
            offset,
        }
    }

    pub fn invalid_environment(owner: impl Into<ObjectId>, environment: impl Into<String>, offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidEnvironment {
            owner: owner.into(),
            environment: environment.into(),
            offset,
            reason: reason.into(),
        }
    }

    pub fn invalid_reduplication(owner: impl Into<ObjectId>, form: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReduplication {
            owner: owner.into(),
            form: form.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_rule(owner: impl Into<ObjectId>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            owner: owner.into(),
            reason: reason.into(),
        }
    }

    /// Object the error should be reported against
    pub fn owner(&self) -> ObjectId {
        match self {
            Self::InvalidShape { owner, .. }
            | Self::InvalidEnvironment { owner, .. }
            | Self::InvalidReduplication { owner, .. }
            | Self::UnsupportedMorphType { owner, .. }
            | Self::UnknownFeatureValue { owner, .. }
            | Self::DanglingReference { owner, .. }
            | Self::InvalidRule { owner, .. } => *owner,
        }
    }

    /// Offset into the offending source string, when there is one
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::InvalidShape { offset, .. } | Self::InvalidEnvironment { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Receiver of non-fatal compile errors
pub trait CompileErrorSink {
    fn report(&mut self, error: CompileError);
}

impl CompileErrorSink for Vec<CompileError> {
    fn report(&mut self, error: CompileError) {
        self.push(error);
    }
}

/// Sink that logs each error at `warn` and only keeps a count
#[derive(Debug, Default)]
pub struct TracingSink {
    pub reported: usize,
}

impl CompileErrorSink for TracingSink {
    fn report(&mut self, error: CompileError) {
        self.reported += 1;
        warn!(owner = %error.owner(), "{error}");
    }
}
