// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store

use crate::store::{apply_barrier_update, apply_transition, sort_consumers};
use crate::{BarrierFilter, BarrierStore, ConstraintStore, ConsumerFilter, DuplicateKey, StoreError};
use chrono::{DateTime, Utc};
use muster_core::{
    BarrierId, BarrierInstance, BarrierState, ConstraintId, ConstraintKey, ConstraintSpec,
    ConsumerId, ConsumerRecord, ConsumerState, PipelineDescriptor,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    specs: HashMap<ConstraintId, ConstraintSpec>,
    consumers: BTreeMap<(ConstraintKey, ConsumerId), ConsumerRecord>,
    barriers: BTreeMap<BarrierId, BarrierInstance>,
}

/// Store that keeps everything in process memory
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConstraintStore for MemoryStore {
    fn create_spec(&self, spec: &ConstraintSpec) -> Result<(), StoreError> {
        let mut state = self.lock();
        match state.specs.get(&spec.id) {
            Some(existing) if existing == spec => Ok(()),
            Some(_) => Err(StoreError::Duplicate {
                key: DuplicateKey::Constraint(spec.id.clone()),
            }),
            None => {
                state.specs.insert(spec.id.clone(), spec.clone());
                Ok(())
            }
        }
    }

    fn get_spec(&self, id: &ConstraintId) -> Result<Option<ConstraintSpec>, StoreError> {
        Ok(self.lock().specs.get(id).cloned())
    }

    fn list_specs(&self, account_id: Option<&str>) -> Result<Vec<ConstraintSpec>, StoreError> {
        let mut specs: Vec<_> = self
            .lock()
            .specs
            .values()
            .filter(|s| account_id.is_none_or(|a| s.account_id == a))
            .cloned()
            .collect();
        specs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(specs)
    }

    fn insert_consumer(&self, record: &ConsumerRecord) -> Result<(), StoreError> {
        let mut state = self.lock();
        let id = (record.key.clone(), record.consumer_id.clone());
        if state.consumers.contains_key(&id) {
            return Err(StoreError::Duplicate {
                key: DuplicateKey::Consumer {
                    key: record.key.clone(),
                    consumer_id: record.consumer_id.clone(),
                },
            });
        }
        let order_taken = state
            .consumers
            .values()
            .any(|c| c.key == record.key && c.order == record.order);
        if order_taken {
            return Err(StoreError::Duplicate {
                key: DuplicateKey::Order {
                    key: record.key.clone(),
                    order: record.order,
                },
            });
        }
        state.consumers.insert(id, record.clone());
        Ok(())
    }

    fn get_consumer(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
    ) -> Result<Option<ConsumerRecord>, StoreError> {
        Ok(self
            .lock()
            .consumers
            .get(&(key.clone(), consumer_id.clone()))
            .cloned())
    }

    fn list_consumers(&self, filter: &ConsumerFilter) -> Result<Vec<ConsumerRecord>, StoreError> {
        let mut records: Vec<_> = self
            .lock()
            .consumers
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        sort_consumers(&mut records);
        Ok(records)
    }

    fn transition_consumer(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
        from: ConsumerState,
        to: ConsumerState,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let record = state
            .consumers
            .get_mut(&(key.clone(), consumer_id.clone()))
            .ok_or_else(|| StoreError::not_found("consumer", format!("{}/{}", key, consumer_id)))?;
        Ok(apply_transition(record, from, to, at))
    }

    fn purge_finished(&self, key: &ConstraintKey) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.consumers.len();
        state
            .consumers
            .retain(|_, c| !(c.key == *key && c.state == ConsumerState::Finished));
        Ok(before - state.consumers.len())
    }
}

impl BarrierStore for MemoryStore {
    fn insert_barrier(&self, barrier: &BarrierInstance) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.barriers.contains_key(&barrier.id) {
            return Err(StoreError::Duplicate {
                key: DuplicateKey::Barrier(barrier.id.clone()),
            });
        }
        state.barriers.insert(barrier.id.clone(), barrier.clone());
        Ok(())
    }

    fn get_barrier(&self, id: &BarrierId) -> Result<Option<BarrierInstance>, StoreError> {
        Ok(self.lock().barriers.get(id).cloned())
    }

    fn list_barriers(&self, filter: &BarrierFilter) -> Result<Vec<BarrierInstance>, StoreError> {
        Ok(self
            .lock()
            .barriers
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    fn update_standing(
        &self,
        id: &BarrierId,
        pipeline: &PipelineDescriptor,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let barrier = state
            .barriers
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("barrier", id))?;
        Ok(apply_barrier_update(barrier, BarrierState::Standing, pipeline, at))
    }

    fn settle_barrier(
        &self,
        id: &BarrierId,
        to: BarrierState,
        pipeline: &PipelineDescriptor,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let barrier = state
            .barriers
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("barrier", id))?;
        Ok(apply_barrier_update(barrier, to, pipeline, at))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
