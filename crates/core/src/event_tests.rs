// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn key() -> ConstraintKey {
    ConstraintKey::new("deploy-slots", "prod")
}

#[test]
fn event_serialization_roundtrip() {
    let events = vec![
        Event::ConsumerRegistered {
            key: key(),
            consumer_id: ConsumerId::from("step-1"),
            blocked: true,
        },
        Event::ConsumerFinished {
            key: key(),
            consumer_id: ConsumerId::from("step-1"),
            released_by: Some(ExecutionRef::workflow("wf-1")),
        },
        Event::BarrierDown {
            barrier_id: BarrierId::from("pipe/0/sync"),
            waiters: vec!["st-1".to_string(), "st-2".to_string()],
        },
    ];

    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}

#[test]
fn events_are_tagged_by_type() {
    let event = Event::BarrierResolved {
        barrier_id: BarrierId::from("pipe/0/sync"),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "barrier_resolved");
    assert_eq!(event.name(), "barrier:resolved");
}

#[test]
fn finished_without_release_entity_omits_field() {
    let event = Event::ConsumerFinished {
        key: key(),
        consumer_id: ConsumerId::from("step-1"),
        released_by: None,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert!(json.get("released_by").is_none());
}

#[yare::parameterized(
    standing = { BarrierState::Standing, None },
    down     = { BarrierState::Down, Some("barrier:down") },
    endure   = { BarrierState::Endure, Some("barrier:endure") },
)]
fn settled_barrier_events(state: BarrierState, expected: Option<&str>) {
    let event = Event::barrier_settled(BarrierId::from("b"), state, vec![]);
    assert_eq!(event.as_ref().map(Event::name), expected);
}
