// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution hierarchy: levels, references and observed statuses
//!
//! A pipeline execution runs stages; each stage runs one workflow execution,
//! which runs phases, which run steps. Resource constraints are released and
//! barriers are resolved by observing executions at one of these levels.

use crate::error::CoordinationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Level of an execution in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Pipeline,
    Workflow,
    Phase,
    Step,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Pipeline => write!(f, "PIPELINE"),
            Level::Workflow => write!(f, "WORKFLOW"),
            Level::Phase => write!(f, "PHASE"),
            Level::Step => write!(f, "STEP"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = CoordinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PIPELINE" => Ok(Level::Pipeline),
            "WORKFLOW" => Ok(Level::Workflow),
            "PHASE" => Ok(Level::Phase),
            "STEP" => Ok(Level::Step),
            other => Err(CoordinationError::unhandled(format!(
                "unknown execution level {other}"
            ))),
        }
    }
}

/// Reference to a concrete execution (a release entity or a forcer id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionRef {
    pub level: Level,
    pub id: String,
}

impl ExecutionRef {
    pub fn new(level: Level, id: impl Into<String>) -> Self {
        Self {
            level,
            id: id.into(),
        }
    }

    pub fn pipeline(id: impl Into<String>) -> Self {
        Self::new(Level::Pipeline, id)
    }

    pub fn workflow(id: impl Into<String>) -> Self {
        Self::new(Level::Workflow, id)
    }

    pub fn phase(id: impl Into<String>) -> Self {
        Self::new(Level::Phase, id)
    }

    pub fn step(id: impl Into<String>) -> Self {
        Self::new(Level::Step, id)
    }

    /// Two consumers overlap when the same execution releases them
    pub fn overlaps(&self, other: &ExecutionRef) -> bool {
        self == other
    }
}

impl std::fmt::Display for ExecutionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.level, self.id)
    }
}

/// Externally observed status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    New,
    Queued,
    Starting,
    Running,
    Paused,
    Waiting,
    Success,
    Failed,
    Error,
    Aborted,
    Rejected,
    Expired,
    Skipped,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            ExecutionStatus::Success
            | ExecutionStatus::Failed
            | ExecutionStatus::Error
            | ExecutionStatus::Aborted
            | ExecutionStatus::Rejected
            | ExecutionStatus::Expired
            | ExecutionStatus::Skipped => true,
            ExecutionStatus::New
            | ExecutionStatus::Queued
            | ExecutionStatus::Starting
            | ExecutionStatus::Running
            | ExecutionStatus::Paused
            | ExecutionStatus::Waiting => false,
        }
    }

    pub fn is_success(self) -> bool {
        self == ExecutionStatus::Success
    }

    /// Finished without succeeding
    pub fn is_broken(self) -> bool {
        self.is_terminal() && !self.is_success()
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::New => "NEW",
            ExecutionStatus::Queued => "QUEUED",
            ExecutionStatus::Starting => "STARTING",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Paused => "PAUSED",
            ExecutionStatus::Waiting => "WAITING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Error => "ERROR",
            ExecutionStatus::Aborted => "ABORTED",
            ExecutionStatus::Rejected => "REJECTED",
            ExecutionStatus::Expired => "EXPIRED",
            ExecutionStatus::Skipped => "SKIPPED",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of statuses gathered before a pure evaluation
#[derive(Debug, Clone, Default)]
pub struct ExecutionStatuses {
    statuses: HashMap<ExecutionRef, ExecutionStatus>,
}

impl ExecutionStatuses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, execution: ExecutionRef, status: ExecutionStatus) {
        self.statuses.insert(execution, status);
    }

    pub fn with(mut self, execution: ExecutionRef, status: ExecutionStatus) -> Self {
        self.insert(execution, status);
        self
    }

    pub fn get(&self, execution: &ExecutionRef) -> Option<ExecutionStatus> {
        self.statuses.get(execution).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Execution ids known to a step at the moment it asks for permits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub pipeline_execution_id: Option<String>,
    pub workflow_execution_id: Option<String>,
    pub phase_execution_id: Option<String>,
    pub step_execution_id: Option<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(mut self, id: impl Into<String>) -> Self {
        self.pipeline_execution_id = Some(id.into());
        self
    }

    pub fn with_workflow(mut self, id: impl Into<String>) -> Self {
        self.workflow_execution_id = Some(id.into());
        self
    }

    pub fn with_phase(mut self, id: impl Into<String>) -> Self {
        self.phase_execution_id = Some(id.into());
        self
    }

    pub fn with_step(mut self, id: impl Into<String>) -> Self {
        self.step_execution_id = Some(id.into());
        self
    }

    /// Resolve the execution whose termination releases permits held at `scope`
    pub fn release_entity(&self, scope: Level) -> Result<ExecutionRef, CoordinationError> {
        let id = match scope {
            Level::Pipeline => &self.pipeline_execution_id,
            Level::Workflow => &self.workflow_execution_id,
            Level::Phase => &self.phase_execution_id,
            Level::Step => &self.step_execution_id,
        };
        match id {
            Some(id) if !id.is_empty() => Ok(ExecutionRef::new(scope, id.clone())),
            _ => Err(CoordinationError::InvalidScope {
                scope,
                reason: format!("no {} execution in context", scope),
            }),
        }
    }
}

/// The kind of child execution a hierarchy lookup asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildKind {
    /// Stage execution of a pipeline execution, keyed by stage id
    Stage,
    /// Workflow execution started by a stage execution, keyed by workflow id
    Workflow,
    /// Phase execution of a workflow execution, keyed by phase id
    Phase,
    /// Step execution of a phase execution, keyed by step id
    Step,
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildKind::Stage => write!(f, "stage"),
            ChildKind::Workflow => write!(f, "workflow"),
            ChildKind::Phase => write!(f, "phase"),
            ChildKind::Step => write!(f, "step"),
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
