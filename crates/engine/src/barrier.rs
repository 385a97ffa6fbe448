// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier evaluation
//!
//! A standing barrier is re-evaluated from scratch: missing execution ids
//! are looked up, a forcer tree is built from what is known and the current
//! statuses decide the state. The evaluation that wins the conditional
//! standing → settled transition is the only one that resumes the waiters.

use crate::error::EngineError;
use crate::report::SweepReport;
use muster_adapters::{HierarchyAdapter, NotifyAdapter, ResumeSignal, StatusAdapter};
use muster_core::{
    BarrierId, BarrierInstance, BarrierState, ChildKind, Clock, Event, ExecutionRef,
    PipelineDescriptor, WorkflowDescriptor,
};
use muster_storage::{BarrierFilter, BarrierStore};
use std::sync::Arc;

/// Result of evaluating one barrier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierUpdate {
    pub barrier_id: BarrierId,
    /// State after the evaluation
    pub state: BarrierState,
    pub events: Vec<Event>,
}

pub struct Barrier<S, St, N, H, C> {
    store: Arc<S>,
    status: St,
    notify: N,
    hierarchy: H,
    clock: C,
}

impl<S, St, N, H, C> Barrier<S, St, N, H, C>
where
    S: BarrierStore,
    St: StatusAdapter,
    N: NotifyAdapter,
    H: HierarchyAdapter,
    C: Clock,
{
    pub fn new(store: Arc<S>, status: St, notify: N, hierarchy: H, clock: C) -> Self {
        Self {
            store,
            status,
            notify,
            hierarchy,
            clock,
        }
    }

    /// Look up execution ids the descriptor is missing
    ///
    /// Returns a new descriptor; merge it into the stored one with
    /// [`PipelineDescriptor::merge`].
    pub async fn resolve(
        &self,
        pipeline: &PipelineDescriptor,
    ) -> Result<PipelineDescriptor, EngineError> {
        let mut workflows = Vec::with_capacity(pipeline.workflows.len());
        for track in &pipeline.workflows {
            workflows.push(self.resolve_track(&pipeline.execution_id, track).await?);
        }
        Ok(PipelineDescriptor::new(
            pipeline.execution_id.clone(),
            workflows,
        ))
    }

    async fn resolve_track(
        &self,
        pipeline_execution_id: &str,
        track: &WorkflowDescriptor,
    ) -> Result<WorkflowDescriptor, EngineError> {
        let mut resolved = track.clone();
        resolved.pipeline_stage_execution_id = self
            .child(
                Some(pipeline_execution_id),
                &track.pipeline_stage_execution_id,
                ChildKind::Stage,
                &track.pipeline_stage_id,
            )
            .await?;
        resolved.workflow_execution_id = self
            .child(
                resolved.pipeline_stage_execution_id.as_deref(),
                &track.workflow_execution_id,
                ChildKind::Workflow,
                &track.workflow_id,
            )
            .await?;
        resolved.phase_execution_id = self
            .child(
                resolved.workflow_execution_id.as_deref(),
                &track.phase_execution_id,
                ChildKind::Phase,
                &track.phase_id,
            )
            .await?;
        resolved.step_execution_id = self
            .child(
                resolved.phase_execution_id.as_deref(),
                &track.step_execution_id,
                ChildKind::Step,
                &track.step_id,
            )
            .await?;
        Ok(resolved)
    }

    async fn child(
        &self,
        parent: Option<&str>,
        cached: &Option<String>,
        kind: ChildKind,
        static_id: &str,
    ) -> Result<Option<String>, EngineError> {
        if cached.is_some() {
            return Ok(cached.clone());
        }
        let Some(parent) = parent else {
            return Ok(None);
        };
        Ok(self.hierarchy.find_child(parent, kind, static_id).await?)
    }

    /// Re-evaluate a barrier; settled barriers are left alone
    pub async fn update(&self, instance: &BarrierInstance) -> Result<BarrierUpdate, EngineError> {
        let unchanged = |state| BarrierUpdate {
            barrier_id: instance.id.clone(),
            state,
            events: Vec::new(),
        };
        if instance.is_terminal() {
            return Ok(unchanged(instance.state));
        }

        let resolved = self.resolve(&instance.pipeline).await?;
        let pipeline = instance.pipeline.merge(&resolved);
        let tree = pipeline.forcer_tree(&instance.app_id);
        let statuses = self.status.statuses(&tree.executions()).await?;
        let state = BarrierState::push_down(&tree, &statuses);
        let now = self.clock.now();

        if state == BarrierState::Standing {
            if pipeline == instance.pipeline {
                return Ok(unchanged(state));
            }
            if !self.store.update_standing(&instance.id, &pipeline, now)? {
                return Ok(unchanged(self.current_state(&instance.id, state)?));
            }
            tracing::debug!(barrier_id = %instance.id, "barrier ids resolved");
            return Ok(BarrierUpdate {
                barrier_id: instance.id.clone(),
                state,
                events: vec![Event::BarrierResolved {
                    barrier_id: instance.id.clone(),
                }],
            });
        }

        if !self.store.settle_barrier(&instance.id, state, &pipeline, now)? {
            // Settled by a concurrent evaluation, which resumed the waiters
            let current = self.current_state(&instance.id, state)?;
            tracing::info!(barrier_id = %instance.id, state = %current, "barrier already settled");
            return Ok(unchanged(current));
        }

        let settled = BarrierInstance {
            state,
            pipeline,
            updated_at: now,
            ..instance.clone()
        };
        let waiters = settled.waiters();
        tracing::info!(
            barrier_id = %settled.id,
            name = %settled.name,
            state = %state,
            waiters = waiters.len(),
            "barrier settled"
        );

        let signal = match state {
            BarrierState::Down => ResumeSignal::Proceed,
            BarrierState::Standing | BarrierState::Endure => ResumeSignal::fail(format!(
                "barrier {} endured: a track will never arrive",
                settled.name
            )),
        };
        for waiter in &waiters {
            if let Err(e) = self.notify.resume(waiter, signal.clone()).await {
                tracing::warn!(
                    barrier_id = %settled.id,
                    waiter,
                    error = %e,
                    "failed to resume waiter"
                );
            }
        }

        Ok(BarrierUpdate {
            barrier_id: settled.id.clone(),
            state,
            events: Event::barrier_settled(settled.id, state, waiters)
                .into_iter()
                .collect(),
        })
    }

    fn current_state(
        &self,
        id: &BarrierId,
        fallback: BarrierState,
    ) -> Result<BarrierState, EngineError> {
        Ok(self
            .store
            .get_barrier(id)?
            .map(|b| b.state)
            .unwrap_or(fallback))
    }

    /// Update every standing barrier, optionally within one app
    pub async fn sweep(&self, app_id: Option<&str>) -> SweepReport {
        let filter = BarrierFilter::standing(app_id.map(str::to_string));
        self.update_matching(&filter, |_| true).await
    }

    /// Update standing barriers `execution` may take part in
    ///
    /// A barrier qualifies when its known executions include `execution` or
    /// when some of its ids are still unresolved, since the finished
    /// execution may be one of them.
    pub async fn execution_finished(&self, execution: &ExecutionRef) -> SweepReport {
        self.update_matching(&BarrierFilter::standing(None), |barrier| {
            barrier.pipeline.workflows.iter().any(|w| !w.is_resolved())
                || barrier.forcer_tree().executions().contains(execution)
        })
        .await
    }

    async fn update_matching(
        &self,
        filter: &BarrierFilter,
        predicate: impl Fn(&BarrierInstance) -> bool,
    ) -> SweepReport {
        let mut report = SweepReport::new();
        let barriers = match self.store.list_barriers(filter) {
            Ok(barriers) => barriers,
            Err(e) => {
                report.fail("barriers", e);
                return report;
            }
        };
        for barrier in barriers.iter().filter(|b| predicate(b)) {
            match self.update(barrier).await {
                Ok(update) => report.record_all(update.events),
                Err(e) => report.fail(&barrier.id, e),
            }
        }
        report
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
