// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events recorded while coordinating consumers and barriers

use crate::coordination::{BarrierState, ConstraintKey};
use crate::execution::ExecutionRef;
use crate::id::{BarrierId, ConsumerId};
use serde::{Deserialize, Serialize};

/// Something that changed in the coordination state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Constraint events
    ConsumerRegistered {
        key: ConstraintKey,
        consumer_id: ConsumerId,
        blocked: bool,
    },
    /// Registration raced with an identical request and was accepted as-is
    ConsumerDuplicate {
        key: ConstraintKey,
        consumer_id: ConsumerId,
    },
    ConsumerUnblocked {
        key: ConstraintKey,
        consumer_id: ConsumerId,
    },
    ConsumerFinished {
        key: ConstraintKey,
        consumer_id: ConsumerId,
        /// Set when the release entity terminated and a sweep finished the consumer
        #[serde(default, skip_serializing_if = "Option::is_none")]
        released_by: Option<ExecutionRef>,
    },

    // Barrier events
    /// New execution ids were discovered for a standing barrier
    BarrierResolved {
        barrier_id: BarrierId,
    },
    BarrierDown {
        barrier_id: BarrierId,
        waiters: Vec<String>,
    },
    BarrierEndure {
        barrier_id: BarrierId,
        waiters: Vec<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ConsumerRegistered { .. } => "consumer:registered",
            Event::ConsumerDuplicate { .. } => "consumer:duplicate",
            Event::ConsumerUnblocked { .. } => "consumer:unblocked",
            Event::ConsumerFinished { .. } => "consumer:finished",
            Event::BarrierResolved { .. } => "barrier:resolved",
            Event::BarrierDown { .. } => "barrier:down",
            Event::BarrierEndure { .. } => "barrier:endure",
        }
    }

    /// Event for a barrier leaving the standing state
    pub fn barrier_settled(
        barrier_id: BarrierId,
        state: BarrierState,
        waiters: Vec<String>,
    ) -> Option<Event> {
        match state {
            BarrierState::Standing => None,
            BarrierState::Down => Some(Event::BarrierDown { barrier_id, waiters }),
            BarrierState::Endure => Some(Event::BarrierEndure { barrier_id, waiters }),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
