//! File-backed store specs
//!
//! Verify coordination state survives a restart of the service.

use crate::prelude::*;
use similar_asserts::assert_eq;
use tempfile::TempDir;

fn json_service(world: &World, dir: &TempDir) -> Service<JsonStore> {
    let config_path = dir.path().join("muster.toml");
    std::fs::write(
        &config_path,
        "sweep_interval = \"10s\"\nregistration_retries = 2\nreport_usage = false\n",
    )
    .unwrap();
    let config = CoordinationConfig::load(&config_path).unwrap();
    world.service(JsonStore::open(dir.path().join("state")).unwrap(), config)
}

#[tokio::test]
async fn queue_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let world = World::new();
    let db = key("db");
    {
        let service = json_service(&world, &dir);
        service.create_constraint(&constraint("db", 1, Strategy::Fifo)).unwrap();
        service.acquire(&request(&db, "a", 1)).await.unwrap();
        service.acquire(&request(&db, "b", 1)).await.unwrap();
    }

    let service = json_service(&world, &dir);
    assert_eq!(service.config().registration_retries, 2);
    let again = service.acquire(&request(&db, "b", 1)).await.unwrap();
    assert!(again.duplicate);
    assert_eq!(again.record.state, ConsumerState::Blocked);

    world.set(ExecutionRef::step("a"), ExecutionStatus::Success);
    let report = service.sweep(None).await;

    assert_eq!(report.consumers_finished, 1);
    assert_eq!(report.consumers_unblocked, 1);
    assert_eq!(world.resumed(), vec![("b".to_string(), ResumeSignal::Proceed)]);
}

#[tokio::test]
async fn barriers_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let world = World::new();
    let plan = parallel_plan("pe/1", &["a", "b"]);
    let a = world.start_track("pe/1", "a");
    let b = world.start_track("pe/1", "b");
    {
        let service = json_service(&world, &dir);
        service.save_barriers(&plan).unwrap();
        world.arrive(&a);
        assert_eq!(
            service.resolve_barrier("pe/1", "a", "sync").await.unwrap(),
            BarrierState::Standing
        );
    }

    let service = json_service(&world, &dir);
    world.arrive(&b);
    let report = service.sweep(None).await;

    assert_eq!(report.barriers_settled, 1);
    let stored = service.list_barriers(&BarrierFilter::for_pipeline("pe/1")).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].state, BarrierState::Down);
    assert_eq!(stored[0].waiters().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_keep_unique_orders() {
    let dir = TempDir::new().unwrap();
    let world = World::new();
    let config = CoordinationConfig::default()
        .with_registration_retries(16)
        .with_report_usage(false);
    let store = JsonStore::open(dir.path().join("state")).unwrap();
    let service = std::sync::Arc::new(world.service(store.clone(), config));
    service.create_constraint(&constraint("db", 2, Strategy::Fifo)).unwrap();
    let db = key("db");

    let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(8));
    let mut handles = Vec::new();
    for i in 0..8 {
        let service = std::sync::Arc::clone(&service);
        let barrier = std::sync::Arc::clone(&barrier);
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.acquire(&request(&db, &format!("c{i}"), 1)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut orders: Vec<u64> = store
        .list_consumers(&ConsumerFilter::for_key(&db))
        .unwrap()
        .iter()
        .map(|c| c.order)
        .collect();
    orders.sort_unstable();
    orders.dedup();
    assert_eq!(orders.len(), 8);
    assert_eq!(used_permits(&store, &db), 2);
}
