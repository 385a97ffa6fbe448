//! Barrier assembly specs
//!
//! Verify which barriers a pipeline plan produces.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn parallel_tracks_share_one_barrier() {
    let world = World::new();
    let service = world.memory();

    let barriers = service
        .save_barriers(&parallel_plan("pe", &["a", "b", "c"]))
        .unwrap();

    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].id.0, "pe/0/sync");
    assert_eq!(barriers[0].state, BarrierState::Standing);
    assert_eq!(barriers[0].pipeline.workflows.len(), 3);
}

#[tokio::test]
async fn sequential_sections_never_share_a_barrier() {
    let world = World::new();
    let service = world.memory();
    let sync = BarrierRef::new("sync", "barrier-phase", "barrier-step");
    let plan = PipelinePlan::new(
        "app",
        "pe",
        vec![
            StagePlan::new("a", "wf-a").with_barrier(sync.clone()),
            StagePlan::new("b", "wf-b").parallel().with_barrier(sync.clone()),
            StagePlan::new("c", "wf-c").with_barrier(sync.clone()),
            StagePlan::new("d", "wf-d").parallel().with_barrier(sync),
        ],
    );

    let ids: Vec<String> = service
        .save_barriers(&plan)
        .unwrap()
        .into_iter()
        .map(|b| b.id.0)
        .collect();

    assert_eq!(ids, vec!["pe/0/sync".to_string(), "pe/1/sync".to_string()]);
}

#[tokio::test]
async fn barrier_referenced_twice_by_one_track_is_rejected() {
    let world = World::new();
    let service = world.memory();
    let mut plan = parallel_plan("pe", &["a", "b"]);
    plan.stages[1]
        .barriers
        .push(BarrierRef::new("sync", "other-phase", "other-step"));

    let err = service.save_barriers(&plan).unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("not running concurrently"));
}

#[tokio::test]
async fn saving_a_plan_again_is_harmless() {
    let world = World::new();
    let service = world.memory();
    let plan = parallel_plan("pe", &["a", "b"]);

    let first = service.save_barriers(&plan).unwrap();
    let second = service.save_barriers(&plan).unwrap();

    assert_eq!(first, second);
    assert_eq!(service.list_barriers(&BarrierFilter::all()).unwrap().len(), 1);
}
