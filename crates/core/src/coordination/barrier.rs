// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier instances: rendezvous points shared by concurrent pipeline tracks

use super::forcer::{Forcer, ForcerState};
use crate::error::CoordinationError;
use crate::execution::{ExecutionStatuses, Level};
use crate::id::BarrierId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// State of a barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarrierState {
    /// Waiting for tracks to arrive
    Standing,
    /// Every track arrived; waiters proceed
    Down,
    /// A track will never arrive; waiters are released with a failure
    Endure,
}

impl BarrierState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BarrierState::Standing)
    }

    /// Barrier state for a pipeline forcer tree
    pub fn push_down(tree: &Forcer, statuses: &ExecutionStatuses) -> BarrierState {
        match tree.state(statuses) {
            ForcerState::Approaching => BarrierState::Standing,
            ForcerState::Arrived => BarrierState::Down,
            ForcerState::Abandoned => BarrierState::Endure,
        }
    }
}

impl std::fmt::Display for BarrierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarrierState::Standing => write!(f, "STANDING"),
            BarrierState::Down => write!(f, "DOWN"),
            BarrierState::Endure => write!(f, "ENDURE"),
        }
    }
}

/// One track of a barrier: where the barrier step lives and what has been found so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    /// Pipeline stage running this track
    pub pipeline_stage_id: String,
    pub workflow_id: String,
    pub phase_id: String,
    pub step_id: String,

    #[serde(default)]
    pub pipeline_stage_execution_id: Option<String>,
    #[serde(default)]
    pub workflow_execution_id: Option<String>,
    #[serde(default)]
    pub phase_execution_id: Option<String>,
    #[serde(default)]
    pub step_execution_id: Option<String>,
}

impl WorkflowDescriptor {
    pub fn new(
        pipeline_stage_id: impl Into<String>,
        workflow_id: impl Into<String>,
        phase_id: impl Into<String>,
        step_id: impl Into<String>,
    ) -> Self {
        Self {
            pipeline_stage_id: pipeline_stage_id.into(),
            workflow_id: workflow_id.into(),
            phase_id: phase_id.into(),
            step_id: step_id.into(),
            pipeline_stage_execution_id: None,
            workflow_execution_id: None,
            phase_execution_id: None,
            step_execution_id: None,
        }
    }

    /// All execution ids have been found
    pub fn is_resolved(&self) -> bool {
        self.pipeline_stage_execution_id.is_some()
            && self.workflow_execution_id.is_some()
            && self.phase_execution_id.is_some()
            && self.step_execution_id.is_some()
    }

    /// Fill ids missing here from `resolved`; ids already cached are kept
    pub fn merge(&self, resolved: &WorkflowDescriptor) -> WorkflowDescriptor {
        if resolved.pipeline_stage_id != self.pipeline_stage_id {
            return self.clone();
        }
        WorkflowDescriptor {
            pipeline_stage_execution_id: self
                .pipeline_stage_execution_id
                .clone()
                .or_else(|| resolved.pipeline_stage_execution_id.clone()),
            workflow_execution_id: self
                .workflow_execution_id
                .clone()
                .or_else(|| resolved.workflow_execution_id.clone()),
            phase_execution_id: self
                .phase_execution_id
                .clone()
                .or_else(|| resolved.phase_execution_id.clone()),
            step_execution_id: self
                .step_execution_id
                .clone()
                .or_else(|| resolved.step_execution_id.clone()),
            ..self.clone()
        }
    }

    /// Workflow → phase → step chain, cut below the first unresolved node
    pub fn forcer(&self, scope: &str) -> Forcer {
        let links = [
            (Level::Step, &self.step_execution_id),
            (Level::Phase, &self.phase_execution_id),
            (Level::Workflow, &self.workflow_execution_id),
        ];
        links
            .into_iter()
            .fold(None, |child: Option<Forcer>, (level, id)| {
                let node = Forcer::new(level, id.clone(), scope);
                Some(match child {
                    Some(child) if node.id.is_some() => node.with_child(child),
                    _ => node,
                })
            })
            .unwrap_or_else(|| Forcer::new(Level::Workflow, None, scope))
    }
}

/// The pipeline execution a barrier belongs to and its tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    pub execution_id: String,
    pub workflows: Vec<WorkflowDescriptor>,
}

impl PipelineDescriptor {
    pub fn new(execution_id: impl Into<String>, workflows: Vec<WorkflowDescriptor>) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflows,
        }
    }

    /// Merge a freshly resolved copy back, track by track
    pub fn merge(&self, resolved: &PipelineDescriptor) -> PipelineDescriptor {
        let workflows = self
            .workflows
            .iter()
            .map(|current| {
                resolved
                    .workflows
                    .iter()
                    .find(|r| r.pipeline_stage_id == current.pipeline_stage_id)
                    .map(|r| current.merge(r))
                    .unwrap_or_else(|| current.clone())
            })
            .collect();
        PipelineDescriptor {
            execution_id: self.execution_id.clone(),
            workflows,
        }
    }

    pub fn forcer_tree(&self, scope: &str) -> Forcer {
        self.workflows.iter().fold(
            Forcer::new(Level::Pipeline, Some(self.execution_id.clone()), scope),
            |root, workflow| root.with_child(workflow.forcer(scope)),
        )
    }
}

/// Persisted barrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierInstance {
    pub id: BarrierId,
    /// Barrier identifier chosen by the user
    pub name: String,
    pub app_id: String,
    /// Concurrent stage section of the pipeline this barrier lives in
    pub section: u32,
    pub state: BarrierState,
    pub pipeline: PipelineDescriptor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BarrierInstance {
    /// Create a standing barrier; needs at least two distinct tracks
    pub fn new(
        name: impl Into<String>,
        app_id: impl Into<String>,
        section: u32,
        pipeline: PipelineDescriptor,
        now: DateTime<Utc>,
    ) -> Result<Self, CoordinationError> {
        let name = name.into();
        if pipeline.workflows.len() < 2 {
            return Err(CoordinationError::InvalidPlan(format!(
                "barrier {name} needs at least two tracks, got {}",
                pipeline.workflows.len()
            )));
        }
        let mut seen = HashSet::new();
        for workflow in &pipeline.workflows {
            if !seen.insert(workflow.pipeline_stage_id.as_str()) {
                return Err(CoordinationError::BarriersNotRunningConcurrently {
                    name,
                    track_id: workflow.pipeline_stage_id.clone(),
                });
            }
        }

        Ok(Self {
            id: BarrierId::for_section(&pipeline.execution_id, section, &name),
            name,
            app_id: app_id.into(),
            section,
            state: BarrierState::Standing,
            pipeline,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Step executions waiting on this barrier
    pub fn waiters(&self) -> Vec<String> {
        self.pipeline
            .workflows
            .iter()
            .filter_map(|w| w.step_execution_id.clone())
            .collect()
    }

    pub fn track(&self, pipeline_stage_id: &str) -> Option<&WorkflowDescriptor> {
        self.pipeline
            .workflows
            .iter()
            .find(|w| w.pipeline_stage_id == pipeline_stage_id)
    }

    pub fn forcer_tree(&self) -> Forcer {
        self.pipeline.forcer_tree(&self.app_id)
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
