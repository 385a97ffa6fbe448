// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store traits and query filters

use crate::StoreError;
use chrono::{DateTime, Utc};
use muster_core::{
    BarrierId, BarrierInstance, BarrierState, ConstraintId, ConstraintKey, ConstraintSpec,
    ConsumerId, ConsumerRecord, ConsumerState, PipelineDescriptor,
};

/// Selects consumer records; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerFilter {
    pub key: Option<ConstraintKey>,
    pub constraint_ids: Option<Vec<ConstraintId>>,
    pub account_id: Option<String>,
    pub app_id: Option<String>,
    /// Empty means any state
    pub states: Vec<ConsumerState>,
}

impl ConsumerFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_key(key: &ConstraintKey) -> Self {
        Self {
            key: Some(key.clone()),
            ..Self::default()
        }
    }

    pub fn with_constraints(mut self, ids: Vec<ConstraintId>) -> Self {
        self.constraint_ids = Some(ids);
        self
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_app(mut self, app_id: Option<String>) -> Self {
        self.app_id = app_id;
        self
    }

    pub fn with_states(mut self, states: &[ConsumerState]) -> Self {
        self.states = states.to_vec();
        self
    }

    /// Consumers that hold or wait for permits
    pub fn live(self) -> Self {
        self.with_states(&[ConsumerState::Blocked, ConsumerState::Active])
    }

    pub fn matches(&self, record: &ConsumerRecord) -> bool {
        self.key.as_ref().is_none_or(|k| *k == record.key)
            && self
                .constraint_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&record.key.constraint_id))
            && self
                .account_id
                .as_ref()
                .is_none_or(|a| *a == record.account_id)
            && self.app_id.as_ref().is_none_or(|a| *a == record.app_id)
            && (self.states.is_empty() || self.states.contains(&record.state))
    }
}

/// Selects barrier instances; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrierFilter {
    pub app_id: Option<String>,
    pub pipeline_execution_id: Option<String>,
    pub name: Option<String>,
    pub state: Option<BarrierState>,
}

impl BarrierFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn standing(app_id: Option<String>) -> Self {
        Self {
            app_id,
            state: Some(BarrierState::Standing),
            ..Self::default()
        }
    }

    pub fn for_pipeline(pipeline_execution_id: impl Into<String>) -> Self {
        Self {
            pipeline_execution_id: Some(pipeline_execution_id.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_state(mut self, state: BarrierState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn matches(&self, barrier: &BarrierInstance) -> bool {
        self.app_id.as_ref().is_none_or(|a| *a == barrier.app_id)
            && self
                .pipeline_execution_id
                .as_ref()
                .is_none_or(|p| *p == barrier.pipeline.execution_id)
            && self.name.as_ref().is_none_or(|n| *n == barrier.name)
            && self.state.is_none_or(|s| s == barrier.state)
    }
}

/// Persistence for constraint specs and their consumers
pub trait ConstraintStore: Send + Sync + 'static {
    /// Create a constraint spec; specs never change once created
    ///
    /// Creating an identical spec again succeeds. A different spec under an
    /// existing id fails with [`StoreError::Duplicate`].
    fn create_spec(&self, spec: &ConstraintSpec) -> Result<(), StoreError>;

    fn get_spec(&self, id: &ConstraintId) -> Result<Option<ConstraintSpec>, StoreError>;

    fn list_specs(&self, account_id: Option<&str>) -> Result<Vec<ConstraintSpec>, StoreError>;

    /// Insert a new consumer
    ///
    /// Fails with [`StoreError::Duplicate`] when the consumer id or the order
    /// is already taken for the record's key.
    fn insert_consumer(&self, record: &ConsumerRecord) -> Result<(), StoreError>;

    fn get_consumer(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
    ) -> Result<Option<ConsumerRecord>, StoreError>;

    /// Matching consumers, sorted by key then registration order
    fn list_consumers(&self, filter: &ConsumerFilter) -> Result<Vec<ConsumerRecord>, StoreError>;

    /// Highest order taken for the key, 0 when none
    ///
    /// New consumers are registered at `max_order + 1`.
    fn max_order(&self, key: &ConstraintKey) -> Result<u64, StoreError> {
        Ok(self
            .list_consumers(&ConsumerFilter::for_key(key))?
            .iter()
            .map(|c| c.order)
            .max()
            .unwrap_or(0))
    }

    /// Move a consumer from `from` to `to` if it is still in `from`
    ///
    /// Returns `false` when the record was in another state. Entering
    /// ACTIVE stamps `acquired_at`.
    fn transition_consumer(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
        from: ConsumerState,
        to: ConsumerState,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete finished consumers of a key, returning how many were removed
    fn purge_finished(&self, key: &ConstraintKey) -> Result<usize, StoreError>;
}

/// Persistence for barrier instances
pub trait BarrierStore: Send + Sync + 'static {
    /// Insert a new barrier; fails with [`StoreError::Duplicate`] if the id exists
    fn insert_barrier(&self, barrier: &BarrierInstance) -> Result<(), StoreError>;

    fn get_barrier(&self, id: &BarrierId) -> Result<Option<BarrierInstance>, StoreError>;

    fn list_barriers(&self, filter: &BarrierFilter) -> Result<Vec<BarrierInstance>, StoreError>;

    /// Merge newly resolved ids into a barrier that is still standing
    ///
    /// Ids already stored are kept, so a stale evaluation cannot drop ids a
    /// concurrent one cached.
    fn update_standing(
        &self,
        id: &BarrierId,
        pipeline: &PipelineDescriptor,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Move a standing barrier to `to`, merging `pipeline` like
    /// [`BarrierStore::update_standing`]
    ///
    /// Exactly one caller observes `true` for a given barrier.
    fn settle_barrier(
        &self,
        id: &BarrierId,
        to: BarrierState,
        pipeline: &PipelineDescriptor,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Apply a consumer transition to an in-memory record
pub(crate) fn apply_transition(
    record: &mut ConsumerRecord,
    from: ConsumerState,
    to: ConsumerState,
    at: DateTime<Utc>,
) -> bool {
    if record.state != from {
        return false;
    }
    record.state = to;
    if to == ConsumerState::Active {
        record.acquired_at = Some(at);
    }
    true
}

/// Apply a barrier update to an in-memory instance
pub(crate) fn apply_barrier_update(
    barrier: &mut BarrierInstance,
    to: BarrierState,
    pipeline: &PipelineDescriptor,
    at: DateTime<Utc>,
) -> bool {
    if barrier.state != BarrierState::Standing {
        return false;
    }
    barrier.state = to;
    barrier.pipeline = barrier.pipeline.merge(pipeline);
    barrier.updated_at = at;
    true
}

pub(crate) fn sort_consumers(records: &mut [ConsumerRecord]) {
    records.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| a.queue_position().cmp(&b.queue_position()))
    });
}
