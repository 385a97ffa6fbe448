//! Constraint sweep specs
//!
//! Verify the periodic sweep recovers from lost termination events.

use crate::prelude::*;
use similar_asserts::assert_eq;

fn setup(world: &World, store: &MemoryStore) -> (Service<MemoryStore>, ConstraintKey) {
    let service = world.service(store.clone(), CoordinationConfig::default());
    service.create_constraint(&constraint("db", 1, Strategy::Fifo)).unwrap();
    (service, key("db"))
}

#[tokio::test]
async fn sweep_releases_permits_of_terminated_executions() {
    let world = World::new();
    let store = MemoryStore::new();
    let (service, db) = setup(&world, &store);
    service.acquire(&request(&db, "a", 1)).await.unwrap();
    service.acquire(&request(&db, "b", 1)).await.unwrap();

    // The termination event for a was never delivered
    world.set(ExecutionRef::step("a"), ExecutionStatus::Error);
    let report = service.sweep(None).await;

    assert_eq!(report.consumers_finished, 1);
    assert_eq!(report.consumers_unblocked, 1);
    assert_eq!(world.resumed(), vec![("b".to_string(), ResumeSignal::Proceed)]);
}

#[tokio::test]
async fn sweeping_twice_changes_nothing_more() {
    let world = World::new();
    let store = MemoryStore::new();
    let (service, db) = setup(&world, &store);
    service.acquire(&request(&db, "a", 1)).await.unwrap();
    service.acquire(&request(&db, "b", 1)).await.unwrap();
    world.set(ExecutionRef::step("a"), ExecutionStatus::Success);

    service.sweep(None).await;
    let before = store.list_consumers(&ConsumerFilter::all()).unwrap();
    let resumes = world.resumed().len();
    let report = service.sweep(None).await;

    assert!(report.is_idle());
    assert_eq!(store.list_consumers(&ConsumerFilter::all()).unwrap(), before);
    assert_eq!(world.resumed().len(), resumes);
}

#[tokio::test]
async fn sweep_reports_usage_to_the_outside() {
    let world = World::new();
    let store = MemoryStore::new();
    let (service, db) = setup(&world, &store);
    service.acquire(&request(&db, "a", 1)).await.unwrap();

    service.sweep(None).await;

    let usage = world.notify.last_usage().unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].key, db);
    assert_eq!(usage[0].used, 1);
}

#[tokio::test]
async fn one_broken_lookup_does_not_stop_the_sweep() {
    let world = World::new();
    let store = MemoryStore::new();
    let (service, db) = setup(&world, &store);
    service
        .create_constraint(&constraint("cache", 1, Strategy::Fifo))
        .unwrap();
    let cache = key("cache");
    service.acquire(&request(&db, "a", 1)).await.unwrap();
    service.acquire(&request(&cache, "c", 1)).await.unwrap();
    world.status.fail(ExecutionRef::step("a"));
    world.set(ExecutionRef::step("c"), ExecutionStatus::Success);

    let report = service.sweep(None).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.consumers_finished, 1);
    assert_eq!(used_permits(&store, &cache), 0);
    assert_eq!(used_permits(&store, &db), 1);
}

#[tokio::test]
async fn failed_resume_is_not_fatal() {
    let world = World::new();
    let store = MemoryStore::new();
    let (service, db) = setup(&world, &store);
    service.acquire(&request(&db, "a", 1)).await.unwrap();
    service.acquire(&request(&db, "b", 1)).await.unwrap();
    world.notify.set_failing(true);

    assert!(service.release(&db, &"a".into()).await.unwrap());

    let b = store.get_consumer(&db, &"b".into()).unwrap().unwrap();
    assert_eq!(b.state, ConsumerState::Active);
}
