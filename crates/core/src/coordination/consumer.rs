// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer records: one per request for permits on a constraint

use crate::error::CoordinationError;
use crate::execution::ExecutionRef;
use crate::id::{ConstraintId, ConsumerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A constraint limits each resource unit independently
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintKey {
    pub constraint_id: ConstraintId,
    pub unit: String,
}

impl ConstraintKey {
    pub fn new(constraint_id: impl Into<ConstraintId>, unit: impl Into<String>) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.constraint_id, self.unit)
    }
}

/// Lifecycle of a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerState {
    /// Waiting for permits
    Blocked,
    /// Holding permits
    Active,
    /// Permits returned (or request cancelled)
    Finished,
}

impl ConsumerState {
    /// Validate a transition, returning the new state
    pub fn transition(self, to: ConsumerState) -> Result<ConsumerState, CoordinationError> {
        match (self, to) {
            (ConsumerState::Blocked, ConsumerState::Active)
            | (ConsumerState::Active, ConsumerState::Finished)
            | (ConsumerState::Blocked, ConsumerState::Finished) => Ok(to),
            (from, to) => Err(CoordinationError::unhandled(format!(
                "consumer transition {from} -> {to}"
            ))),
        }
    }

    /// Holds or waits for permits
    pub fn is_live(self) -> bool {
        matches!(self, ConsumerState::Blocked | ConsumerState::Active)
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerState::Blocked => write!(f, "BLOCKED"),
            ConsumerState::Active => write!(f, "ACTIVE"),
            ConsumerState::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Persisted request for permits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerRecord {
    pub consumer_id: ConsumerId,
    pub key: ConstraintKey,
    pub account_id: String,
    pub app_id: String,
    /// Execution whose termination frees these permits
    pub release_entity: ExecutionRef,
    pub permits: u32,
    /// Registration sequence within the key
    pub order: u64,
    pub state: ConsumerState,
    pub acquired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConsumerRecord {
    pub fn is_blocked(&self) -> bool {
        self.state == ConsumerState::Blocked
    }

    pub fn is_active(&self) -> bool {
        self.state == ConsumerState::Active
    }

    /// Sort key used for admission: registration order, ties by consumer id
    pub fn queue_position(&self) -> (u64, &ConsumerId) {
        (self.order, &self.consumer_id)
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
