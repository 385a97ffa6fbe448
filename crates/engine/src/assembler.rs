// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a pipeline plan into barrier instances
//!
//! Stages run in sections: a stage that is not parallel starts a new
//! section, a parallel stage joins the current one. Barriers only make sense
//! between tracks of the same section, so references are grouped by
//! section and name.

use muster_core::{
    BarrierInstance, Clock, CoordinationError, PipelineDescriptor, WorkflowDescriptor,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A barrier step inside a stage's workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierRef {
    pub name: String,
    pub phase_id: String,
    pub step_id: String,
}

impl BarrierRef {
    pub fn new(
        name: impl Into<String>,
        phase_id: impl Into<String>,
        step_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phase_id: phase_id.into(),
            step_id: step_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub stage_id: String,
    pub workflow_id: String,
    /// Runs alongside the previous stage
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub barriers: Vec<BarrierRef>,
}

impl StagePlan {
    pub fn new(stage_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            workflow_id: workflow_id.into(),
            parallel: false,
            disabled: false,
            barriers: Vec::new(),
        }
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_barrier(mut self, barrier: BarrierRef) -> Self {
        self.barriers.push(barrier);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub app_id: String,
    pub pipeline_execution_id: String,
    pub stages: Vec<StagePlan>,
}

impl PipelinePlan {
    pub fn new(
        app_id: impl Into<String>,
        pipeline_execution_id: impl Into<String>,
        stages: Vec<StagePlan>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            pipeline_execution_id: pipeline_execution_id.into(),
            stages,
        }
    }

    /// Enabled stages with the section each one runs in
    pub fn sections(&self) -> Vec<(u32, &StagePlan)> {
        let mut section = 0;
        let mut out = Vec::new();
        for (i, stage) in self.stages.iter().enumerate() {
            // A disabled stage still closes the running section
            if i > 0 && !stage.parallel {
                section += 1;
            }
            if !stage.disabled {
                out.push((section, stage));
            }
        }
        out
    }
}

pub struct BarrierAssembler<C> {
    clock: C,
}

impl<C: Clock> BarrierAssembler<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Standing barriers for every name shared by at least two tracks of a section
    pub fn assemble(&self, plan: &PipelinePlan) -> Result<Vec<BarrierInstance>, CoordinationError> {
        let mut groups: BTreeMap<(u32, &str), Vec<WorkflowDescriptor>> = BTreeMap::new();
        for (section, stage) in plan.sections() {
            for barrier in &stage.barriers {
                let tracks = groups.entry((section, barrier.name.as_str())).or_default();
                if tracks
                    .iter()
                    .any(|t| t.pipeline_stage_id == stage.stage_id)
                {
                    return Err(CoordinationError::BarriersNotRunningConcurrently {
                        name: barrier.name.clone(),
                        track_id: stage.stage_id.clone(),
                    });
                }
                tracks.push(WorkflowDescriptor::new(
                    stage.stage_id.clone(),
                    stage.workflow_id.clone(),
                    barrier.phase_id.clone(),
                    barrier.step_id.clone(),
                ));
            }
        }

        let now = self.clock.now();
        let mut instances = Vec::new();
        for ((section, name), tracks) in groups {
            if tracks.len() < 2 {
                tracing::debug!(name, section, "barrier has a single track, skipping");
                continue;
            }
            instances.push(BarrierInstance::new(
                name,
                plan.app_id.clone(),
                section,
                PipelineDescriptor::new(plan.pipeline_execution_id.clone(), tracks),
                now,
            )?);
        }
        Ok(instances)
    }
}

#[cfg(test)]
#[path = "assembler_tests.rs"]
mod tests;
