//! Barrier lifecycle specs
//!
//! Verify waiting steps are released together, exactly once.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn barrier_goes_down_once_every_track_arrives() {
    let world = World::new();
    let service = world.memory();
    service
        .save_barriers(&parallel_plan("pe", &["a", "b", "c"]))
        .unwrap();
    let tracks: Vec<Track> = ["a", "b", "c"]
        .iter()
        .map(|s| world.start_track("pe", s))
        .collect();

    world.arrive(&tracks[0]);
    world.arrive(&tracks[1]);
    assert_eq!(
        service.resolve_barrier("pe", "a", "sync").await.unwrap(),
        BarrierState::Standing
    );
    assert!(world.resumed().is_empty());

    world.arrive(&tracks[2]);
    assert_eq!(
        service.resolve_barrier("pe", "c", "sync").await.unwrap(),
        BarrierState::Down
    );

    // Every waiter proceeds exactly once, however often the barrier is evaluated
    service.resolve_barrier("pe", "b", "sync").await.unwrap();
    service.sweep(None).await;
    let mut resumed: Vec<String> = world.resumed().into_iter().map(|(w, _)| w).collect();
    resumed.sort();
    let steps: Vec<String> = tracks.iter().map(|t| t.step.clone()).collect();
    assert_eq!(resumed, steps);
    assert!(world.resumed().iter().all(|(_, s)| s.is_proceed()));
}

#[tokio::test]
async fn failed_track_releases_waiters_with_a_failure() {
    let world = World::new();
    let service = world.memory();
    service
        .save_barriers(&parallel_plan("pe", &["a", "b"]))
        .unwrap();
    let a = world.start_track("pe", "a");
    let b = world.start_track("pe", "b");
    world.arrive(&a);
    assert_eq!(
        service.resolve_barrier("pe", "a", "sync").await.unwrap(),
        BarrierState::Standing
    );

    world.set(ExecutionRef::workflow(&b.workflow), ExecutionStatus::Failed);
    let report = service
        .execution_finished(&ExecutionRef::workflow(&b.workflow))
        .await;

    assert_eq!(report.barriers_settled, 1);
    let resumed = world.resumed();
    assert_eq!(resumed.len(), 2);
    assert!(resumed.iter().all(|(_, s)| !s.is_proceed()));
    let filter = BarrierFilter::for_pipeline("pe").with_state(BarrierState::Endure);
    assert_eq!(service.list_barriers(&filter).unwrap().len(), 1);
}

#[tokio::test]
async fn track_failing_before_any_evaluation_endures_the_barrier() {
    let world = World::new();
    let service = world.memory();
    let barrier = service
        .save_barriers(&parallel_plan("pe", &["a", "b"]))
        .unwrap()
        .remove(0);
    world.start_track("pe", "a");
    let b = world.start_track("pe", "b");

    world.set(ExecutionRef::workflow(&b.workflow), ExecutionStatus::Failed);
    let report = service
        .execution_finished(&ExecutionRef::workflow(&b.workflow))
        .await;

    assert_eq!(report.barriers_settled, 1);
    assert_eq!(service.get_barrier(&barrier.id).unwrap().state, BarrierState::Endure);
}

#[tokio::test]
async fn settled_barrier_never_changes_again() {
    let world = World::new();
    let service = world.memory();
    let barrier = service
        .save_barriers(&parallel_plan("pe", &["a", "b"]))
        .unwrap()
        .remove(0);
    let a = world.start_track("pe", "a");
    let b = world.start_track("pe", "b");
    world.arrive(&a);
    world.arrive(&b);
    service.sweep(None).await;

    // A track failing after the rendezvous does not turn DOWN into ENDURE
    world.set(ExecutionRef::workflow(&b.workflow), ExecutionStatus::Failed);
    service.sweep(None).await;
    service
        .execution_finished(&ExecutionRef::workflow(&b.workflow))
        .await;

    assert_eq!(service.get_barrier(&barrier.id).unwrap().state, BarrierState::Down);
    assert_eq!(world.resumed().len(), 2);
}

#[tokio::test]
async fn sweep_settles_barriers_whose_events_were_lost() {
    let world = World::new();
    let service = world.memory();
    let barrier = service
        .save_barriers(&parallel_plan("pe", &["a", "b"]))
        .unwrap()
        .remove(0);
    let a = world.start_track("pe", "a");
    let b = world.start_track("pe", "b");
    world.arrive(&a);
    world.arrive(&b);

    let report = service.sweep(None).await;

    assert_eq!(report.barriers_settled, 1);
    assert_eq!(service.get_barrier(&barrier.id).unwrap().state, BarrierState::Down);
    assert!(service.sweep(None).await.is_idle());
}
