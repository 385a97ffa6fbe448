// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by the engine tests

use crate::assembler::{BarrierRef, PipelinePlan, StagePlan};
use crate::config::CoordinationConfig;
use crate::registry::{AcquireRequest, ConstraintRegistry};
use crate::service::{CoordinationService, ServiceDeps};
use muster_adapters::{FakeHierarchyAdapter, FakeNotifyAdapter, FakeStatusAdapter};
use muster_core::{
    ChildKind, ConstraintKey, ConstraintSpec, ExecutionContext, FakeClock, Level, Strategy,
};
use muster_storage::{ConstraintStore, MemoryStore};
use std::sync::Arc;

pub type TestRegistry =
    ConstraintRegistry<MemoryStore, FakeStatusAdapter, FakeNotifyAdapter, FakeClock>;

pub type TestService = CoordinationService<
    MemoryStore,
    FakeStatusAdapter,
    FakeNotifyAdapter,
    FakeHierarchyAdapter,
    FakeClock,
>;

/// Service wired to fakes; the handles share state with the service
pub struct Harness {
    pub store: MemoryStore,
    pub status: FakeStatusAdapter,
    pub notify: FakeNotifyAdapter,
    pub hierarchy: FakeHierarchyAdapter,
    pub clock: FakeClock,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            status: FakeStatusAdapter::new(),
            notify: FakeNotifyAdapter::new(),
            hierarchy: FakeHierarchyAdapter::new(),
            clock: FakeClock::new(),
        }
    }

    pub fn service(&self, config: CoordinationConfig) -> TestService {
        CoordinationService::new(
            ServiceDeps {
                store: self.store.clone(),
                status: self.status.clone(),
                notify: self.notify.clone(),
                hierarchy: self.hierarchy.clone(),
            },
            self.clock.clone(),
            config,
        )
    }

    pub fn registry(&self) -> TestRegistry {
        ConstraintRegistry::new(
            Arc::new(self.store.clone()),
            self.status.clone(),
            self.notify.clone(),
            self.clock.clone(),
            CoordinationConfig::default(),
        )
    }

    /// Save a constraint with the given capacity and strategy
    pub fn constraint(&self, id: &str, capacity: u32, strategy: Strategy) -> ConstraintKey {
        let spec = ConstraintSpec::new(id, "acct-1", id, capacity).with_strategy(strategy);
        self.store.create_spec(&spec).unwrap();
        ConstraintKey::new(id, "unit-1")
    }

    /// Register the execution chain a track resolves through
    ///
    /// `pe → stage-exec → wf-exec → ph-exec → st-exec`, with ids derived from
    /// the stage id.
    pub fn track_chain(&self, pe: &str, stage_id: &str, workflow_id: &str) -> TrackIds {
        let ids = TrackIds::for_stage(stage_id);
        self.hierarchy
            .add_child(pe, ChildKind::Stage, stage_id, &ids.stage);
        self.hierarchy
            .add_child(&ids.stage, ChildKind::Workflow, workflow_id, &ids.workflow);
        self.hierarchy
            .add_child(&ids.workflow, ChildKind::Phase, "phase-1", &ids.phase);
        self.hierarchy
            .add_child(&ids.phase, ChildKind::Step, "wait", &ids.step);
        ids
    }
}

/// Execution ids of one resolved track
#[derive(Debug, Clone)]
pub struct TrackIds {
    pub stage: String,
    pub workflow: String,
    pub phase: String,
    pub step: String,
}

impl TrackIds {
    pub fn for_stage(stage_id: &str) -> Self {
        Self {
            stage: format!("{stage_id}-exec"),
            workflow: format!("{stage_id}-wf"),
            phase: format!("{stage_id}-ph"),
            step: format!("{stage_id}-st"),
        }
    }
}

/// Step-scoped request; the step execution id doubles as consumer id
pub fn step_request(key: &ConstraintKey, step: &str, permits: u32) -> AcquireRequest {
    AcquireRequest::new(
        key.clone(),
        step,
        permits,
        Level::Step,
        ExecutionContext::new()
            .with_pipeline("pe-1")
            .with_workflow(format!("{step}-wf"))
            .with_step(step),
    )
    .with_account("acct-1")
    .with_app("app-1")
}

/// Parallel stages that all wait on the barrier `sync`
pub fn parallel_plan(pe: &str, stages: &[&str]) -> PipelinePlan {
    let plans = stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let plan = StagePlan::new(*stage, format!("wf-{stage}"))
                .with_barrier(BarrierRef::new("sync", "phase-1", "wait"));
            if i > 0 {
                plan.parallel()
            } else {
                plan
            }
        })
        .collect();
    PipelinePlan::new("app-1", pe, plans)
}
