//! Constraint admission specs
//!
//! Verify permits are never oversubscribed and waiters are admitted fairly.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn capacity_is_never_exceeded() {
    let world = World::new();
    let store = MemoryStore::new();
    let service = world.service(store.clone(), CoordinationConfig::default());
    service.create_constraint(&constraint("gpu", 3, Strategy::Asap)).unwrap();
    let gpu = key("gpu");

    let permits = [2, 1, 2, 1, 3, 1, 1];
    for (i, p) in permits.iter().enumerate() {
        service.acquire(&request(&gpu, &format!("s{i}"), *p)).await.unwrap();
        assert!(used_permits(&store, &gpu) <= 3);
    }
    for i in 0..permits.len() {
        service.release(&gpu, &ConsumerId::from(format!("s{i}"))).await.unwrap();
        assert!(used_permits(&store, &gpu) <= 3);
    }

    assert_eq!(used_permits(&store, &gpu), 0);
    let live = store
        .list_consumers(&ConsumerFilter::for_key(&gpu).live())
        .unwrap();
    assert!(live.is_empty(), "left behind: {live:?}");
}

#[tokio::test]
async fn fifo_admits_in_arrival_order() {
    let world = World::new();
    let service = world.memory();
    service.create_constraint(&constraint("db", 2, Strategy::Fifo)).unwrap();
    let db = key("db");

    service.acquire(&request(&db, "holder", 2)).await.unwrap();
    service.acquire(&request(&db, "big", 2)).await.unwrap();
    service.acquire(&request(&db, "small-1", 1)).await.unwrap();
    service.acquire(&request(&db, "small-2", 1)).await.unwrap();

    service.release(&db, &"holder".into()).await.unwrap();
    service.release(&db, &"big".into()).await.unwrap();

    let order: Vec<String> = world.resumed().into_iter().map(|(w, _)| w).collect();
    let expected: Vec<String> = ["big", "small-1", "small-2"].map(String::from).to_vec();
    assert_eq!(order, expected);
}

#[tokio::test]
async fn asap_lets_small_requests_through() {
    let world = World::new();
    let service = world.memory();
    service.create_constraint(&constraint("db", 2, Strategy::Asap)).unwrap();
    let db = key("db");

    service.acquire(&request(&db, "holder", 1)).await.unwrap();
    let big = service.acquire(&request(&db, "big", 2)).await.unwrap();
    let small = service.acquire(&request(&db, "small", 1)).await.unwrap();

    assert!(!big.is_active());
    assert!(small.is_active());
}

#[tokio::test]
async fn repeated_registration_is_harmless() {
    let world = World::new();
    let store = MemoryStore::new();
    let service = world.service(store.clone(), CoordinationConfig::default());
    service.create_constraint(&constraint("db", 1, Strategy::Fifo)).unwrap();
    let db = key("db");

    let first = service.acquire(&request(&db, "a", 1)).await.unwrap();
    let retry = service.acquire(&request(&db, "a", 1)).await.unwrap();

    assert!(retry.duplicate);
    assert_eq!(retry.record, first.record);
    assert_eq!(store.list_consumers(&ConsumerFilter::all()).unwrap().len(), 1);
}

#[tokio::test]
async fn configuration_errors_reach_the_caller() {
    let world = World::new();
    let service = world.memory();
    service.create_constraint(&constraint("db", 1, Strategy::Fifo)).unwrap();
    let db = key("db");

    let too_many = service.acquire(&request(&db, "a", 2)).await.unwrap_err();
    let no_scope = service
        .acquire(&AcquireRequest::new(
            db.clone(),
            "b",
            1,
            Level::Phase,
            ExecutionContext::new().with_step("b"),
        ))
        .await
        .unwrap_err();

    assert!(too_many.is_fatal());
    assert!(no_scope.is_fatal());
    assert!(matches!(no_scope, EngineError::Coordination(_)));
}

#[tokio::test]
async fn permits_held_at_workflow_scope_outlive_the_step() {
    let world = World::new();
    let store = MemoryStore::new();
    let service = world.service(store.clone(), CoordinationConfig::default());
    service.create_constraint(&constraint("db", 1, Strategy::Fifo)).unwrap();
    let db = key("db");
    let context = ExecutionContext::new()
        .with_pipeline("pe")
        .with_workflow("wf-1")
        .with_step("step-1");
    service
        .acquire(&AcquireRequest::new(db.clone(), "step-1", 1, Level::Workflow, context))
        .await
        .unwrap();

    world.set(ExecutionRef::step("step-1"), ExecutionStatus::Success);
    service.execution_finished(&ExecutionRef::step("step-1")).await;
    assert_eq!(used_permits(&store, &db), 1);

    world.set(ExecutionRef::workflow("wf-1"), ExecutionStatus::Success);
    service.execution_finished(&ExecutionRef::workflow("wf-1")).await;
    assert_eq!(used_permits(&store, &db), 0);
}

#[tokio::test]
async fn redefining_a_constraint_never_strands_waiters() {
    let world = World::new();
    let service = world.memory();
    service.create_constraint(&constraint("db", 3, Strategy::Fifo)).unwrap();
    let db = key("db");
    service.acquire(&request(&db, "s1", 3)).await.unwrap();
    service.acquire(&request(&db, "s2", 2)).await.unwrap();
    service.acquire(&request(&db, "s3", 1)).await.unwrap();

    let err = service
        .create_constraint(&constraint("db", 1, Strategy::Fifo))
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)), "unexpected: {err}");

    service.release(&db, &"s1".into()).await.unwrap();
    let report = service.sweep(None).await;

    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
    let order: Vec<String> = world.resumed().into_iter().map(|(w, _)| w).collect();
    let expected: Vec<String> = ["s2", "s3"].map(String::from).to_vec();
    assert_eq!(order, expected);
}
