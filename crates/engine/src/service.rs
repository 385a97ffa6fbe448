// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level coordination API

use crate::assembler::{BarrierAssembler, PipelinePlan};
use crate::barrier::Barrier;
use crate::config::CoordinationConfig;
use crate::error::EngineError;
use crate::registry::{AcquireRequest, ConstraintRegistry, Registration};
use crate::report::SweepReport;
use muster_adapters::{HierarchyAdapter, NotifyAdapter, StatusAdapter};
use muster_core::{
    BarrierId, BarrierInstance, BarrierState, Clock, ConstraintId, ConstraintKey, ConstraintSpec,
    ConstraintUsage, ConsumerId, ExecutionRef,
};
use muster_storage::{BarrierFilter, BarrierStore, ConstraintStore, DuplicateKey, StoreError};
use std::sync::Arc;

/// Collaborators of the coordination service
pub struct ServiceDeps<S, St, N, H> {
    pub store: S,
    pub status: St,
    pub notify: N,
    pub hierarchy: H,
}

/// Resource constraints and barriers behind one API
pub struct CoordinationService<S, St, N, H, C> {
    store: Arc<S>,
    registry: ConstraintRegistry<S, St, N, C>,
    barriers: Barrier<S, St, N, H, C>,
    assembler: BarrierAssembler<C>,
    config: CoordinationConfig,
}

impl<S, St, N, H, C> CoordinationService<S, St, N, H, C>
where
    S: ConstraintStore + BarrierStore,
    St: StatusAdapter,
    N: NotifyAdapter,
    H: HierarchyAdapter,
    C: Clock,
{
    pub fn new(deps: ServiceDeps<S, St, N, H>, clock: C, config: CoordinationConfig) -> Self {
        let store = Arc::new(deps.store);
        Self {
            registry: ConstraintRegistry::new(
                Arc::clone(&store),
                deps.status.clone(),
                deps.notify.clone(),
                clock.clone(),
                config.clone(),
            ),
            barriers: Barrier::new(
                Arc::clone(&store),
                deps.status,
                deps.notify,
                deps.hierarchy,
                clock.clone(),
            ),
            assembler: BarrierAssembler::new(clock),
            store,
            config,
        }
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConstraintRegistry<S, St, N, C> {
        &self.registry
    }

    pub fn barriers(&self) -> &Barrier<S, St, N, H, C> {
        &self.barriers
    }

    // -- constraints ---------------------------------------------------------

    /// Create a constraint definition
    ///
    /// Definitions never change: creating the same one again is a no-op and a
    /// different definition under an existing id is rejected, so capacity can
    /// never drop below the permits already handed out.
    pub fn create_constraint(&self, spec: &ConstraintSpec) -> Result<(), EngineError> {
        self.store.create_spec(spec)?;
        tracing::info!(
            constraint_id = %spec.id,
            capacity = spec.capacity,
            strategy = ?spec.strategy,
            "constraint created"
        );
        Ok(())
    }

    pub fn get_constraint(&self, id: &ConstraintId) -> Result<ConstraintSpec, EngineError> {
        self.registry.spec(id)
    }

    pub fn list_constraints(
        &self,
        account_id: Option<&str>,
    ) -> Result<Vec<ConstraintSpec>, EngineError> {
        Ok(self.store.list_specs(account_id)?)
    }

    /// Ask for permits; a blocked consumer is resumed once permits free up
    pub async fn acquire(&self, request: &AcquireRequest) -> Result<Registration, EngineError> {
        self.registry.register_consumer(request).await
    }

    /// Return permits and admit whoever fits next
    ///
    /// Returns `false` if the consumer had already finished.
    pub async fn release(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
    ) -> Result<bool, EngineError> {
        let finished = self.registry.consumer_finished(key, consumer_id)?;
        if finished {
            self.registry.refresh(key).await?;
        }
        Ok(finished)
    }

    pub fn usage(
        &self,
        account_id: &str,
        constraint_ids: &[ConstraintId],
    ) -> Result<Vec<ConstraintUsage>, EngineError> {
        self.registry.usage(account_id, constraint_ids)
    }

    pub fn purge_finished(&self, key: &ConstraintKey) -> Result<usize, EngineError> {
        self.registry.purge_finished(key)
    }

    // -- barriers ------------------------------------------------------------

    /// Create the barriers of a pipeline execution
    ///
    /// Barriers that already exist are returned as stored, so saving the same
    /// plan twice is harmless.
    pub fn save_barriers(&self, plan: &PipelinePlan) -> Result<Vec<BarrierInstance>, EngineError> {
        let mut saved = Vec::new();
        for barrier in self.assembler.assemble(plan)? {
            match self.store.insert_barrier(&barrier) {
                Ok(()) => {
                    tracing::info!(
                        barrier_id = %barrier.id,
                        tracks = barrier.pipeline.workflows.len(),
                        "barrier created"
                    );
                    saved.push(barrier);
                }
                Err(StoreError::Duplicate {
                    key: DuplicateKey::Barrier(id),
                }) => {
                    tracing::info!(barrier_id = %id, "barrier already exists");
                    saved.push(self.get_barrier(&id)?);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(saved)
    }

    pub fn get_barrier(&self, id: &BarrierId) -> Result<BarrierInstance, EngineError> {
        self.store
            .get_barrier(id)?
            .ok_or_else(|| EngineError::BarrierNotFound(id.to_string()))
    }

    pub fn list_barriers(
        &self,
        filter: &BarrierFilter,
    ) -> Result<Vec<BarrierInstance>, EngineError> {
        Ok(self.store.list_barriers(filter)?)
    }

    /// Called by a barrier step when it reaches the barrier
    ///
    /// Returns the state the step should act on: wait while standing,
    /// proceed when down, fail when enduring.
    pub async fn resolve_barrier(
        &self,
        pipeline_execution_id: &str,
        stage_id: &str,
        name: &str,
    ) -> Result<BarrierState, EngineError> {
        let filter = BarrierFilter::for_pipeline(pipeline_execution_id).with_name(name);
        let barrier = self
            .store
            .list_barriers(&filter)?
            .into_iter()
            .find(|b| b.track(stage_id).is_some())
            .ok_or_else(|| {
                EngineError::BarrierNotFound(format!(
                    "{pipeline_execution_id}/{stage_id}/{name}"
                ))
            })?;
        Ok(self.barriers.update(&barrier).await?.state)
    }

    // -- callbacks -----------------------------------------------------------

    /// Re-evaluate what an execution's termination may have changed
    pub async fn execution_finished(&self, execution: &ExecutionRef) -> SweepReport {
        tracing::debug!(%execution, "execution finished");
        let mut report = self.registry.release_entity_finished(execution).await;
        report.merge(self.barriers.execution_finished(execution).await);
        report
    }

    /// Reconcile constraints and barriers, optionally within one app
    pub async fn sweep(&self, app_id: Option<&str>) -> SweepReport {
        let mut report = self.registry.sweep(app_id).await;
        report.merge(self.barriers.sweep(app_id).await);
        report
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
