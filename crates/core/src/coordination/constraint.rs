// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource constraint admission
//!
//! A constraint hands out a fixed number of permits per resource unit.
//! Admission is re-derived from the full consumer queue on every call, so
//! evaluating the same queue twice always yields the same answer.

use super::consumer::{ConstraintKey, ConsumerRecord, ConsumerState};
use crate::error::CoordinationError;
use crate::execution::ExecutionRef;
use crate::id::{ConstraintId, ConsumerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order in which blocked consumers are admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Strict arrival order: a consumer that does not fit holds back everyone behind it
    #[default]
    Fifo,
    /// Admit whatever fits, in arrival order
    Asap,
}

/// Constraint definition, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub id: ConstraintId,
    pub account_id: String,
    pub name: String,
    /// Permits available per resource unit
    pub capacity: u32,
    #[serde(default)]
    pub strategy: Strategy,
}

impl ConstraintSpec {
    pub fn new(
        id: impl Into<ConstraintId>,
        account_id: impl Into<String>,
        name: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            name: name.into(),
            capacity,
            strategy: Strategy::Fifo,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reject requests that can never be satisfied
    pub fn check_permits(
        &self,
        consumer_id: &ConsumerId,
        permits: u32,
    ) -> Result<(), CoordinationError> {
        if permits > self.capacity {
            return Err(CoordinationError::PermitsExceedCapacity {
                constraint_id: self.id.clone(),
                consumer_id: consumer_id.clone(),
                requested: permits,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

/// A consumer currently holding permits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConsumer {
    pub consumer_id: ConsumerId,
    pub release_entity: ExecutionRef,
    pub permits: u32,
    pub acquired_at: Option<DateTime<Utc>>,
}

/// Usage snapshot for one constraint key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintUsage {
    pub key: ConstraintKey,
    pub capacity: u32,
    pub used: u32,
    pub active: Vec<ActiveConsumer>,
}

/// A constraint spec together with the consumer queue of one key
#[derive(Clone, Debug)]
pub struct Constraint {
    pub spec: ConstraintSpec,
    pub key: ConstraintKey,
    /// Consumers sorted by registration order
    consumers: Vec<ConsumerRecord>,
}

impl Constraint {
    pub fn new(
        spec: ConstraintSpec,
        key: ConstraintKey,
        mut consumers: Vec<ConsumerRecord>,
    ) -> Self {
        consumers.retain(|c| c.key == key);
        consumers.sort_by(|a, b| a.queue_position().cmp(&b.queue_position()));
        Self {
            spec,
            key,
            consumers,
        }
    }

    pub fn consumers(&self) -> &[ConsumerRecord] {
        &self.consumers
    }

    /// Permits held by active consumers
    pub fn used_permits(&self) -> u32 {
        self.consumers
            .iter()
            .filter(|c| c.is_active())
            .map(|c| c.permits)
            .sum()
    }

    pub fn available_permits(&self) -> u32 {
        self.spec.capacity.saturating_sub(self.used_permits())
    }

    pub fn has_blocked(&self) -> bool {
        self.consumers.iter().any(|c| c.is_blocked())
    }

    /// Blocked consumers that may become active now, in admission order
    ///
    /// A blocked consumer is never admitted ahead of an earlier, still blocked
    /// request of the same release entity.
    pub fn runnable_consumers(&self) -> Result<Vec<ConsumerId>, CoordinationError> {
        let capacity = u64::from(self.spec.capacity);
        let mut used = u64::from(self.used_permits());
        let mut runnable = Vec::new();
        let mut waiting: Vec<&ExecutionRef> = Vec::new();

        for consumer in self.consumers.iter().filter(|c| c.is_blocked()) {
            self.spec.check_permits(&consumer.consumer_id, consumer.permits)?;

            let fits = used + u64::from(consumer.permits) <= capacity;
            let overtakes_itself = waiting
                .iter()
                .any(|entity| entity.overlaps(&consumer.release_entity));

            if fits && !overtakes_itself {
                used += u64::from(consumer.permits);
                runnable.push(consumer.consumer_id.clone());
                continue;
            }

            match self.spec.strategy {
                Strategy::Fifo => break,
                Strategy::Asap => waiting.push(&consumer.release_entity),
            }
        }

        Ok(runnable)
    }

    /// State a new consumer should be registered in
    ///
    /// The candidate is evaluated as the last entry of the queue. Under FIFO a
    /// runnable candidate still waits while anyone ahead of it is blocked;
    /// the follow-up refresh admits them in order.
    pub fn initial_state(
        &self,
        candidate: &ConsumerRecord,
    ) -> Result<ConsumerState, CoordinationError> {
        self.spec.check_permits(&candidate.consumer_id, candidate.permits)?;

        let mut queue = self.clone();
        queue.consumers.retain(|c| c.consumer_id != candidate.consumer_id);
        queue.consumers.push(ConsumerRecord {
            state: ConsumerState::Blocked,
            ..candidate.clone()
        });

        let runnable = queue.runnable_consumers()?;
        if !runnable.contains(&candidate.consumer_id) {
            return Ok(ConsumerState::Blocked);
        }

        match self.spec.strategy {
            Strategy::Fifo if self.has_blocked() => Ok(ConsumerState::Blocked),
            Strategy::Fifo | Strategy::Asap => Ok(ConsumerState::Active),
        }
    }

    /// Snapshot of who holds permits
    pub fn usage(&self) -> ConstraintUsage {
        ConstraintUsage {
            key: self.key.clone(),
            capacity: self.spec.capacity,
            used: self.used_permits(),
            active: self
                .consumers
                .iter()
                .filter(|c| c.is_active())
                .map(|c| ActiveConsumer {
                    consumer_id: c.consumer_id.clone(),
                    release_entity: c.release_entity.clone(),
                    permits: c.permits,
                    acquired_at: c.acquired_at,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "constraint_tests.rs"]
mod tests;
