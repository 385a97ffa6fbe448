// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store errors

use muster_core::{BarrierId, ConstraintId, ConstraintKey, ConsumerId};
use thiserror::Error;

/// Unique key that an insert collided with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateKey {
    /// A different spec already exists under this id
    Constraint(ConstraintId),
    /// The consumer already registered for this key
    Consumer {
        key: ConstraintKey,
        consumer_id: ConsumerId,
    },
    /// Another consumer took this order first
    Order { key: ConstraintKey, order: u64 },
    Barrier(BarrierId),
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKey::Constraint(id) => write!(f, "constraint {}", id),
            DuplicateKey::Consumer { key, consumer_id } => {
                write!(f, "consumer {} on {}", consumer_id, key)
            }
            DuplicateKey::Order { key, order } => write!(f, "order {} on {}", order, key),
            DuplicateKey::Barrier(id) => write!(f, "barrier {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
    #[error("duplicate key: {key}")]
    Duplicate { key: DuplicateKey },
    /// An insert failed and removing its partial state failed too
    #[error("{error}; removing {path} also failed: {cleanup}")]
    Stranded {
        error: Box<StoreError>,
        path: String,
        cleanup: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}
