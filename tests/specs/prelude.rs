//! Shared fixtures for the behavioral specs

pub use muster_adapters::{
    FakeHierarchyAdapter, FakeNotifyAdapter, FakeStatusAdapter, NotifyCall, ResumeSignal,
};
pub use muster_core::{
    BarrierState, ChildKind, ConstraintKey, ConstraintSpec, ConsumerId, ConsumerState,
    ExecutionContext, ExecutionRef, ExecutionStatus, FakeClock, Level, Strategy,
};
pub use muster_engine::{
    AcquireRequest, BarrierRef, CoordinationConfig, CoordinationService, EngineError,
    PipelinePlan, ServiceDeps, StagePlan, SweepReport,
};
pub use muster_storage::{
    BarrierFilter, BarrierStore, ConstraintStore, ConsumerFilter, JsonStore, MemoryStore,
};

pub type Service<S> = CoordinationService<
    S,
    FakeStatusAdapter,
    FakeNotifyAdapter,
    FakeHierarchyAdapter,
    FakeClock,
>;

/// The outside world as the engine sees it
pub struct World {
    pub status: FakeStatusAdapter,
    pub notify: FakeNotifyAdapter,
    pub hierarchy: FakeHierarchyAdapter,
    pub clock: FakeClock,
}

impl World {
    pub fn new() -> Self {
        Self {
            status: FakeStatusAdapter::new(),
            notify: FakeNotifyAdapter::new(),
            hierarchy: FakeHierarchyAdapter::new(),
            clock: FakeClock::new(),
        }
    }

    pub fn service<S: ConstraintStore + BarrierStore>(
        &self,
        store: S,
        config: CoordinationConfig,
    ) -> Service<S> {
        CoordinationService::new(
            ServiceDeps {
                store,
                status: self.status.clone(),
                notify: self.notify.clone(),
                hierarchy: self.hierarchy.clone(),
            },
            self.clock.clone(),
            config,
        )
    }

    /// In-memory service that does not publish usage
    pub fn memory(&self) -> Service<MemoryStore> {
        self.service(
            MemoryStore::new(),
            CoordinationConfig::default().with_report_usage(false),
        )
    }

    pub fn set(&self, execution: ExecutionRef, status: ExecutionStatus) {
        self.status.set(execution, status);
    }

    /// Start a track of `pipeline` and return its barrier step execution
    pub fn start_track(&self, pipeline: &str, stage: &str) -> Track {
        let track = Track::new(pipeline, stage);
        self.hierarchy
            .add_child(pipeline, ChildKind::Stage, stage, &track.stage);
        self.hierarchy
            .add_child(&track.stage, ChildKind::Workflow, format!("wf-{stage}"), &track.workflow);
        self.hierarchy
            .add_child(&track.workflow, ChildKind::Phase, "barrier-phase", &track.phase);
        self.hierarchy
            .add_child(&track.phase, ChildKind::Step, "barrier-step", &track.step);
        track
    }

    /// A track reaches its barrier step
    pub fn arrive(&self, track: &Track) {
        self.set(ExecutionRef::step(&track.step), ExecutionStatus::Running);
    }

    /// Steps resumed so far, in order
    pub fn resumed(&self) -> Vec<(String, ResumeSignal)> {
        self.notify.resumes()
    }
}

/// Execution ids of one running track
pub struct Track {
    pub stage: String,
    pub workflow: String,
    pub phase: String,
    pub step: String,
}

impl Track {
    fn new(pipeline: &str, stage: &str) -> Self {
        Self {
            stage: format!("{pipeline}.{stage}"),
            workflow: format!("{pipeline}.{stage}.wf"),
            phase: format!("{pipeline}.{stage}.ph"),
            step: format!("{pipeline}.{stage}.st"),
        }
    }
}

pub fn constraint(id: &str, capacity: u32, strategy: Strategy) -> ConstraintSpec {
    ConstraintSpec::new(id, "acct", id, capacity).with_strategy(strategy)
}

pub fn key(id: &str) -> ConstraintKey {
    ConstraintKey::new(id, "shared")
}

/// Step `consumer` asks for permits held until the step terminates
pub fn request(key: &ConstraintKey, consumer: &str, permits: u32) -> AcquireRequest {
    AcquireRequest::new(
        key.clone(),
        consumer,
        permits,
        Level::Step,
        ExecutionContext::new()
            .with_pipeline("pe")
            .with_workflow("wf")
            .with_step(consumer),
    )
    .with_account("acct")
    .with_app("app")
}

/// Stages that run side by side and all wait on the barrier `sync`
pub fn parallel_plan(pipeline: &str, stages: &[&str]) -> PipelinePlan {
    let stages = stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let plan = StagePlan::new(*stage, format!("wf-{stage}"))
                .with_barrier(BarrierRef::new("sync", "barrier-phase", "barrier-step"));
            if i == 0 {
                plan
            } else {
                plan.parallel()
            }
        })
        .collect();
    PipelinePlan::new("app", pipeline, stages)
}

/// Active permits per key, straight from the store
pub fn used_permits<S: ConstraintStore>(store: &S, key: &ConstraintKey) -> u32 {
    store
        .list_consumers(&ConsumerFilter::for_key(key).with_states(&[ConsumerState::Active]))
        .unwrap()
        .iter()
        .map(|c| c.permits)
        .sum()
}
