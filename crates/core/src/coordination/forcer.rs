// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forcer trees: arrival state derived from the execution hierarchy
//!
//! A forcer is a node standing for one execution (pipeline, workflow, phase
//! or step). Trees are rebuilt on every evaluation from the ids resolved so
//! far; nothing here is persisted.

use crate::execution::{ExecutionRef, ExecutionStatus, ExecutionStatuses, Level};
use serde::{Deserialize, Serialize};

/// Arrival state of a forcer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForcerState {
    /// Still on its way to the rendezvous point
    Approaching,
    /// Reached the rendezvous point
    Arrived,
    /// Will never reach the rendezvous point
    Abandoned,
}

/// Level tag and owning scope of a forcer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcerMetadata {
    pub level: Level,
    pub scope: String,
}

/// Node of a forcer tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forcer {
    /// Execution id, absent until it can be discovered
    pub id: Option<String>,
    pub metadata: ForcerMetadata,
    pub children: Vec<Forcer>,
}

impl Forcer {
    pub fn new(level: Level, id: Option<String>, scope: impl Into<String>) -> Self {
        Self {
            id,
            metadata: ForcerMetadata {
                level,
                scope: scope.into(),
            },
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Forcer) -> Self {
        self.children.push(child);
        self
    }

    pub fn level(&self) -> Level {
        self.metadata.level
    }

    pub fn execution(&self) -> Option<ExecutionRef> {
        self.id
            .as_ref()
            .map(|id| ExecutionRef::new(self.metadata.level, id.clone()))
    }

    /// Every resolved execution in the tree, parents before children
    pub fn executions(&self) -> Vec<ExecutionRef> {
        let mut out = Vec::new();
        self.collect_executions(&mut out);
        out
    }

    fn collect_executions(&self, out: &mut Vec<ExecutionRef>) {
        if let Some(execution) = self.execution() {
            out.push(execution);
        }
        for child in &self.children {
            child.collect_executions(out);
        }
    }

    /// Derive the arrival state of this node from observed statuses
    pub fn state(&self, statuses: &ExecutionStatuses) -> ForcerState {
        self.evaluate(statuses, false)
    }

    fn evaluate(&self, statuses: &ExecutionStatuses, parent_done: bool) -> ForcerState {
        let Some(execution) = self.execution() else {
            // An execution that finished without starting this child never will
            return if parent_done {
                ForcerState::Abandoned
            } else {
                ForcerState::Approaching
            };
        };
        let status = statuses.get(&execution);

        match self.metadata.level {
            Level::Step => step_state(status),
            Level::Pipeline | Level::Workflow | Level::Phase => {
                if status.is_some_and(ExecutionStatus::is_broken) {
                    return ForcerState::Abandoned;
                }
                let done = status.is_some_and(ExecutionStatus::is_terminal);
                if self.children.is_empty() {
                    return if done {
                        ForcerState::Arrived
                    } else {
                        ForcerState::Approaching
                    };
                }
                push_down(self.children.iter().map(|c| c.evaluate(statuses, done)))
            }
        }
    }
}

/// Reaching the barrier step is the rendezvous; it does not need to finish
fn step_state(status: Option<ExecutionStatus>) -> ForcerState {
    match status {
        Some(ExecutionStatus::Success | ExecutionStatus::Running | ExecutionStatus::Starting) => {
            ForcerState::Arrived
        }
        Some(status) if status.is_terminal() => ForcerState::Abandoned,
        Some(_) | None => ForcerState::Approaching,
    }
}

/// Combine sibling states: any abandoned abandons, all arrived arrives
pub fn push_down(states: impl IntoIterator<Item = ForcerState>) -> ForcerState {
    let mut all_arrived = true;
    for state in states {
        match state {
            ForcerState::Abandoned => return ForcerState::Abandoned,
            ForcerState::Approaching => all_arrived = false,
            ForcerState::Arrived => {}
        }
    }
    if all_arrived {
        ForcerState::Arrived
    } else {
        ForcerState::Approaching
    }
}

#[cfg(test)]
#[path = "forcer_tests.rs"]
mod tests;
