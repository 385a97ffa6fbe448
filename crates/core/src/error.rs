// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by the coordination algorithms

use crate::execution::Level;
use crate::id::{ConstraintId, ConsumerId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    /// The requested holding scope is not present in the execution context
    #[error("invalid scope {scope}: {reason}")]
    InvalidScope { scope: Level, reason: String },

    /// A consumer asked for more permits than the constraint can ever grant
    #[error(
        "consumer {consumer_id} requests {requested} permits but constraint {constraint_id} has capacity {capacity}"
    )]
    PermitsExceedCapacity {
        constraint_id: ConstraintId,
        consumer_id: ConsumerId,
        requested: u32,
        capacity: u32,
    },

    /// Two references to one barrier live in the same concurrent track
    #[error("barrier {name} is referenced twice by track {track_id}; barriers are not running concurrently")]
    BarriersNotRunningConcurrently { name: String, track_id: String },

    /// A pipeline plan that cannot be turned into barriers
    #[error("invalid pipeline plan: {0}")]
    InvalidPlan(String),

    /// A case the code does not know how to handle (version skew, corrupt record)
    #[error("unhandled case: {0}")]
    Unhandled(String),
}

impl CoordinationError {
    /// Configuration errors are never retried and must reach the caller
    pub fn is_fatal(&self) -> bool {
        match self {
            CoordinationError::InvalidScope { .. }
            | CoordinationError::PermitsExceedCapacity { .. }
            | CoordinationError::BarriersNotRunningConcurrently { .. }
            | CoordinationError::InvalidPlan(_) => true,
            CoordinationError::Unhandled(_) => false,
        }
    }

    pub fn unhandled(what: impl std::fmt::Display) -> Self {
        CoordinationError::Unhandled(what.to_string())
    }
}
