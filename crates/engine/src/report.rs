// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome of a sweep

use muster_core::Event;

/// One item a sweep could not process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub item: String,
    pub error: String,
}

/// What a sweep (or an event-triggered re-evaluation) changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub consumers_finished: usize,
    pub consumers_unblocked: usize,
    pub barriers_resolved: usize,
    pub barriers_settled: usize,
    pub failures: Vec<SweepFailure>,
    pub events: Vec<Event>,
}

impl SweepReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count and keep an event
    pub fn record(&mut self, event: Event) {
        match &event {
            Event::ConsumerFinished { .. } => self.consumers_finished += 1,
            Event::ConsumerUnblocked { .. } => self.consumers_unblocked += 1,
            Event::BarrierResolved { .. } => self.barriers_resolved += 1,
            Event::BarrierDown { .. } | Event::BarrierEndure { .. } => self.barriers_settled += 1,
            Event::ConsumerRegistered { .. } | Event::ConsumerDuplicate { .. } => {}
        }
        tracing::debug!(event = event.name(), "recorded");
        self.events.push(event);
    }

    pub fn record_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.record(event);
        }
    }

    /// Note an item that failed; the sweep carries on with the rest
    pub fn fail(&mut self, item: impl std::fmt::Display, error: impl std::fmt::Display) {
        let failure = SweepFailure {
            item: item.to_string(),
            error: error.to_string(),
        };
        tracing::error!(item = %failure.item, error = %failure.error, "sweep item failed");
        self.failures.push(failure);
    }

    pub fn merge(&mut self, other: SweepReport) {
        self.consumers_finished += other.consumers_finished;
        self.consumers_unblocked += other.consumers_unblocked;
        self.barriers_resolved += other.barriers_resolved;
        self.barriers_settled += other.barriers_settled;
        self.failures.extend(other.failures);
        self.events.extend(other.events);
    }

    /// Nothing changed and nothing failed
    pub fn is_idle(&self) -> bool {
        self.events.is_empty() && self.failures.is_empty()
    }
}
