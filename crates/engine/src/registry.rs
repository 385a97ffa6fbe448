// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Constraint registry: registers consumers and moves them between states
//!
//! Every decision is re-derived from the consumers persisted for a key. The
//! store's unique keys on `(key, consumer_id)` and `(key, order)` are the
//! only mutual exclusion between concurrent registrations; state changes are
//! conditional updates, so a consumer is unblocked (and resumed) once.

use crate::config::CoordinationConfig;
use crate::error::EngineError;
use crate::report::SweepReport;
use muster_adapters::{NotifyAdapter, ResumeSignal, StatusAdapter};
use muster_core::{
    Clock, Constraint, ConstraintId, ConstraintKey, ConstraintSpec, ConstraintUsage, ConsumerId,
    ConsumerRecord, ConsumerState, CoordinationError, Event, ExecutionContext, ExecutionRef,
    ExecutionStatus, Level,
};
use muster_storage::{ConstraintStore, ConsumerFilter, DuplicateKey, StoreError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Blocked → active → finished can race at most twice
const FINISH_ATTEMPTS: usize = 3;

/// A request for permits on one constraint key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireRequest {
    pub key: ConstraintKey,
    /// Execution asking for permits
    pub consumer_id: ConsumerId,
    pub account_id: String,
    pub app_id: String,
    pub permits: u32,
    /// Level whose execution holds the permits until it terminates
    pub scope: Level,
    pub context: ExecutionContext,
}

impl AcquireRequest {
    pub fn new(
        key: ConstraintKey,
        consumer_id: impl Into<ConsumerId>,
        permits: u32,
        scope: Level,
        context: ExecutionContext,
    ) -> Self {
        Self {
            key,
            consumer_id: consumer_id.into(),
            account_id: String::new(),
            app_id: String::new(),
            permits,
            scope,
            context,
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn with_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }
}

/// Outcome of a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The stored record, re-read after registration settled
    pub record: ConsumerRecord,
    /// The consumer was already registered; nothing was inserted
    pub duplicate: bool,
    pub events: Vec<Event>,
}

impl Registration {
    /// The caller may proceed without waiting for a resume
    pub fn is_active(&self) -> bool {
        self.record.is_active()
    }
}

pub struct ConstraintRegistry<S, St, N, C> {
    store: Arc<S>,
    status: St,
    notify: N,
    clock: C,
    config: CoordinationConfig,
}

impl<S, St, N, C> ConstraintRegistry<S, St, N, C>
where
    S: ConstraintStore,
    St: StatusAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(store: Arc<S>, status: St, notify: N, clock: C, config: CoordinationConfig) -> Self {
        Self {
            store,
            status,
            notify,
            clock,
            config,
        }
    }

    pub fn spec(&self, id: &ConstraintId) -> Result<ConstraintSpec, EngineError> {
        self.store
            .get_spec(id)?
            .ok_or_else(|| EngineError::ConstraintNotFound(id.clone()))
    }

    /// The constraint of a key with its current consumer queue
    pub fn load(&self, key: &ConstraintKey) -> Result<Constraint, EngineError> {
        let spec = self.spec(&key.constraint_id)?;
        let consumers = self.store.list_consumers(&ConsumerFilter::for_key(key))?;
        Ok(Constraint::new(spec, key.clone(), consumers))
    }

    /// Register a consumer, ACTIVE if it can run now and BLOCKED otherwise
    ///
    /// Registering the same consumer twice returns the stored record. An
    /// order taken by a concurrent registration is retried with a fresh read.
    pub async fn register_consumer(
        &self,
        request: &AcquireRequest,
    ) -> Result<Registration, EngineError> {
        let spec = self.spec(&request.key.constraint_id)?;
        spec.check_permits(&request.consumer_id, request.permits)?;
        let release_entity = request.context.release_entity(request.scope)?;

        let attempts = self.config.registration_retries.saturating_add(1);
        for attempt in 1..=attempts {
            if let Some(existing) = self.store.get_consumer(&request.key, &request.consumer_id)? {
                return Ok(self.duplicate(existing));
            }

            // Order first: a registration that claims an order after this read
            // either collides with ours or shows up in the queue
            let order = self.store.max_order(&request.key)? + 1;
            let consumers = self
                .store
                .list_consumers(&ConsumerFilter::for_key(&request.key))?;
            let constraint = Constraint::new(spec.clone(), request.key.clone(), consumers);
            let now = self.clock.now();
            let mut record = ConsumerRecord {
                consumer_id: request.consumer_id.clone(),
                key: request.key.clone(),
                account_id: request.account_id.clone(),
                app_id: request.app_id.clone(),
                release_entity: release_entity.clone(),
                permits: request.permits,
                order,
                state: ConsumerState::Blocked,
                acquired_at: None,
                created_at: now,
            };
            record.state = constraint.initial_state(&record)?;
            if record.is_active() {
                record.acquired_at = Some(now);
            }

            match self.store.insert_consumer(&record) {
                Ok(()) => return self.registered(record).await,
                Err(StoreError::Duplicate {
                    key: DuplicateKey::Consumer { .. },
                }) => {
                    if let Some(existing) =
                        self.store.get_consumer(&request.key, &request.consumer_id)?
                    {
                        return Ok(self.duplicate(existing));
                    }
                }
                Err(StoreError::Duplicate {
                    key: DuplicateKey::Order { order, .. },
                }) => {
                    tracing::info!(
                        key = %request.key,
                        consumer_id = %request.consumer_id,
                        order,
                        attempt,
                        "order taken by a concurrent registration, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::RegistrationConflict {
            key: request.key.clone(),
            consumer_id: request.consumer_id.clone(),
            attempts,
        })
    }

    fn duplicate(&self, existing: ConsumerRecord) -> Registration {
        tracing::info!(
            key = %existing.key,
            consumer_id = %existing.consumer_id,
            state = %existing.state,
            "consumer already registered"
        );
        let event = Event::ConsumerDuplicate {
            key: existing.key.clone(),
            consumer_id: existing.consumer_id.clone(),
        };
        Registration {
            record: existing,
            duplicate: true,
            events: vec![event],
        }
    }

    async fn registered(&self, record: ConsumerRecord) -> Result<Registration, EngineError> {
        tracing::info!(
            key = %record.key,
            consumer_id = %record.consumer_id,
            order = record.order,
            state = %record.state,
            "consumer registered"
        );
        let mut events = vec![Event::ConsumerRegistered {
            key: record.key.clone(),
            consumer_id: record.consumer_id.clone(),
            blocked: record.is_blocked(),
        }];
        if !record.is_blocked() {
            return Ok(Registration {
                record,
                duplicate: false,
                events,
            });
        }

        // Admit whoever fits now; the caller learns its own state from the result
        events.extend(self.refresh_key(&record.key, Some(&record.consumer_id)).await?);
        let record = self
            .store
            .get_consumer(&record.key, &record.consumer_id)?
            .unwrap_or(record);
        Ok(Registration {
            record,
            duplicate: false,
            events,
        })
    }

    /// Move a blocked consumer to ACTIVE and resume it
    ///
    /// Returns `false` if the consumer was no longer blocked.
    pub async fn consumer_unblocked(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
    ) -> Result<bool, EngineError> {
        Ok(self.unblock(key, consumer_id, true).await?.is_some())
    }

    async fn unblock(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
        resume: bool,
    ) -> Result<Option<Event>, EngineError> {
        let won = self.store.transition_consumer(
            key,
            consumer_id,
            ConsumerState::Blocked,
            ConsumerState::Active,
            self.clock.now(),
        )?;
        if !won {
            tracing::info!(%key, %consumer_id, "consumer no longer blocked");
            return Ok(None);
        }

        tracing::info!(%key, %consumer_id, "consumer unblocked");
        if resume {
            if let Err(e) = self.notify.resume(&consumer_id.0, ResumeSignal::Proceed).await {
                tracing::warn!(%key, %consumer_id, error = %e, "failed to resume consumer");
            }
        }
        Ok(Some(Event::ConsumerUnblocked {
            key: key.clone(),
            consumer_id: consumer_id.clone(),
        }))
    }

    /// Return a consumer's permits (or cancel its request)
    ///
    /// Returns `false` if it had already finished.
    pub fn consumer_finished(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
    ) -> Result<bool, EngineError> {
        Ok(self.finish(key, consumer_id, None)?.is_some())
    }

    fn finish(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
        released_by: Option<&ExecutionRef>,
    ) -> Result<Option<Event>, EngineError> {
        for _ in 0..FINISH_ATTEMPTS {
            let record = self.store.get_consumer(key, consumer_id)?.ok_or_else(|| {
                EngineError::ConsumerNotFound {
                    key: key.clone(),
                    consumer_id: consumer_id.clone(),
                }
            })?;
            if record.state == ConsumerState::Finished {
                return Ok(None);
            }

            let to = record.state.transition(ConsumerState::Finished)?;
            if self
                .store
                .transition_consumer(key, consumer_id, record.state, to, self.clock.now())?
            {
                tracing::info!(%key, %consumer_id, from = %record.state, "consumer finished");
                return Ok(Some(Event::ConsumerFinished {
                    key: key.clone(),
                    consumer_id: consumer_id.clone(),
                    released_by: released_by.cloned(),
                }));
            }
        }

        Err(CoordinationError::unhandled(format!(
            "consumer {consumer_id} on {key} kept changing state while finishing"
        ))
        .into())
    }

    /// Unblock every consumer that can run now
    pub async fn refresh(&self, key: &ConstraintKey) -> Result<Vec<Event>, EngineError> {
        self.refresh_key(key, None).await
    }

    /// Refresh without resuming `quiet`, which learns its state from the caller
    async fn refresh_key(
        &self,
        key: &ConstraintKey,
        quiet: Option<&ConsumerId>,
    ) -> Result<Vec<Event>, EngineError> {
        let runnable = self.load(key)?.runnable_consumers()?;
        let mut events = Vec::new();
        for consumer_id in runnable {
            let resume = quiet != Some(&consumer_id);
            if let Some(event) = self.unblock(key, &consumer_id, resume).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Finish consumers released by `execution` and admit whoever fits next
    pub async fn release_entity_finished(&self, execution: &ExecutionRef) -> SweepReport {
        let mut report = SweepReport::new();
        let live = match self.store.list_consumers(&ConsumerFilter::all().live()) {
            Ok(live) => live,
            Err(e) => {
                report.fail("consumers", e);
                return report;
            }
        };

        let mut keys = BTreeSet::new();
        for consumer in live.iter().filter(|c| c.release_entity == *execution) {
            keys.insert(consumer.key.clone());
            match self.finish(&consumer.key, &consumer.consumer_id, Some(execution)) {
                Ok(event) => report.record_all(event),
                Err(e) => report.fail(format!("{}/{}", consumer.key, consumer.consumer_id), e),
            }
        }
        for key in keys {
            match self.refresh(&key).await {
                Ok(events) => report.record_all(events),
                Err(e) => report.fail(&key, e),
            }
        }
        report
    }

    /// Reconcile consumers against execution statuses
    ///
    /// (a) live consumers whose release entity terminated are finished;
    /// (b) every key with a blocked consumer is refreshed once. Failures are
    /// reported per item and never stop the sweep.
    pub async fn sweep(&self, app_id: Option<&str>) -> SweepReport {
        let mut report = SweepReport::new();
        let app = app_id.map(str::to_string);

        let live = match self
            .store
            .list_consumers(&ConsumerFilter::all().with_app(app.clone()).live())
        {
            Ok(live) => live,
            Err(e) => {
                report.fail("consumers", e);
                return report;
            }
        };

        let entities: BTreeSet<&ExecutionRef> = live.iter().map(|c| &c.release_entity).collect();
        let mut statuses: BTreeMap<&ExecutionRef, ExecutionStatus> = BTreeMap::new();
        for entity in entities {
            match self.status.status(entity).await {
                Ok(Some(status)) => {
                    statuses.insert(entity, status);
                }
                Ok(None) => {}
                Err(e) => report.fail(entity, e),
            }
        }

        for consumer in &live {
            let terminated = statuses
                .get(&consumer.release_entity)
                .is_some_and(|s| s.is_terminal());
            if !terminated {
                continue;
            }
            match self.finish(
                &consumer.key,
                &consumer.consumer_id,
                Some(&consumer.release_entity),
            ) {
                Ok(event) => report.record_all(event),
                Err(e) => report.fail(format!("{}/{}", consumer.key, consumer.consumer_id), e),
            }
        }

        let blocked = ConsumerFilter::all()
            .with_app(app)
            .with_states(&[ConsumerState::Blocked]);
        match self.store.list_consumers(&blocked) {
            Ok(records) => {
                let keys: BTreeSet<ConstraintKey> = records.into_iter().map(|c| c.key).collect();
                for key in keys {
                    match self.refresh(&key).await {
                        Ok(events) => report.record_all(events),
                        Err(e) => report.fail(&key, e),
                    }
                }
            }
            Err(e) => report.fail("blocked consumers", e),
        }

        if self.config.report_usage {
            let keys: BTreeSet<&ConstraintKey> = live.iter().map(|c| &c.key).collect();
            self.report_usage(keys.into_iter(), &mut report).await;
        }

        report
    }

    async fn report_usage<'a>(
        &self,
        keys: impl Iterator<Item = &'a ConstraintKey>,
        report: &mut SweepReport,
    ) {
        let mut usage = Vec::new();
        for key in keys {
            match self.load(key) {
                Ok(constraint) => usage.push(constraint.usage()),
                Err(e) => report.fail(key, e),
            }
        }
        if usage.is_empty() {
            return;
        }
        if let Err(e) = self.notify.report_usage(&usage).await {
            tracing::warn!(keys = usage.len(), error = %e, "failed to report usage");
        }
    }

    /// Permits held per key for an account
    ///
    /// An empty `constraint_ids` covers every constraint of the account.
    pub fn usage(
        &self,
        account_id: &str,
        constraint_ids: &[ConstraintId],
    ) -> Result<Vec<ConstraintUsage>, EngineError> {
        let mut filter = ConsumerFilter::all().with_account(account_id).live();
        if !constraint_ids.is_empty() {
            filter = filter.with_constraints(constraint_ids.to_vec());
        }
        let keys: BTreeSet<ConstraintKey> = self
            .store
            .list_consumers(&filter)?
            .into_iter()
            .map(|c| c.key)
            .collect();
        keys.iter().map(|key| Ok(self.load(key)?.usage())).collect()
    }

    /// Delete finished consumers of a key
    pub fn purge_finished(&self, key: &ConstraintKey) -> Result<usize, EngineError> {
        let purged = self.store.purge_finished(key)?;
        tracing::info!(%key, purged, "purged finished consumers");
        Ok(purged)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
