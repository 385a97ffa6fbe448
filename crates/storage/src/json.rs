// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based store
//!
//! Layout under the base path:
//!
//! ```text
//! constraints/<constraint>.json
//! consumers/<constraint>/<unit>/records/<consumer>.json
//! consumers/<constraint>/<unit>/orders/<order>.claim
//! barriers/<barrier>.json
//! .lock
//! ```
//!
//! New records are published with a hard link, which fails if the target
//! exists, so readers never see a half-written record and unique keys hold
//! across processes. Consumer inserts, consumer listings and read-modify-write
//! updates hold an exclusive lock on `.lock`, so a listing never sees an
//! order claimed without its record.

use crate::store::{apply_barrier_update, apply_transition, sort_consumers};
use crate::{BarrierFilter, BarrierStore, ConstraintStore, ConsumerFilter, DuplicateKey, StoreError};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use muster_core::{
    BarrierId, BarrierInstance, BarrierState, ConstraintId, ConstraintKey, ConstraintSpec,
    ConsumerId, ConsumerRecord, ConsumerState, PipelineDescriptor,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const CONSTRAINTS: &str = "constraints";
const CONSUMERS: &str = "consumers";
const BARRIERS: &str = "barriers";

/// JSON file-based store
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_path: PathBuf,
}

impl JsonStore {
    /// Open a store at the given path, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Run `f` while holding the store's exclusive file lock
    fn locked<T>(&self, f: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(".lock"))?;
        lock.lock_exclusive()?;
        let result = f();
        FileExt::unlock(&lock)?;
        result
    }

    fn spec_path(&self, id: &ConstraintId) -> PathBuf {
        self.base_path
            .join(CONSTRAINTS)
            .join(format!("{}.json", encode(&id.0)))
    }

    fn key_dir(&self, key: &ConstraintKey) -> PathBuf {
        self.base_path
            .join(CONSUMERS)
            .join(encode(&key.constraint_id.0))
            .join(encode(&key.unit))
    }

    fn consumer_path(&self, key: &ConstraintKey, consumer_id: &ConsumerId) -> PathBuf {
        self.key_dir(key)
            .join("records")
            .join(format!("{}.json", encode(&consumer_id.0)))
    }

    fn order_path(&self, key: &ConstraintKey, order: u64) -> PathBuf {
        self.key_dir(key)
            .join("orders")
            .join(format!("{}.claim", order))
    }

    fn barrier_path(&self, id: &BarrierId) -> PathBuf {
        self.base_path
            .join(BARRIERS)
            .join(format!("{}.json", encode(&id.0)))
    }

    /// Directories holding consumer records, narrowed by the filter's key
    fn record_dirs(&self, filter: &ConsumerFilter) -> Result<Vec<PathBuf>, StoreError> {
        if let Some(key) = &filter.key {
            return Ok(vec![self.key_dir(key).join("records")]);
        }
        let mut dirs = Vec::new();
        for constraint in subdirs(&self.base_path.join(CONSUMERS))? {
            for unit in subdirs(&constraint)? {
                dirs.push(unit.join("records"));
            }
        }
        Ok(dirs)
    }
}

impl ConstraintStore for JsonStore {
    fn create_spec(&self, spec: &ConstraintSpec) -> Result<(), StoreError> {
        let path = self.spec_path(&spec.id);
        if publish_json(&path, spec)? {
            return Ok(());
        }
        match read_json::<ConstraintSpec>(&path)? {
            Some(existing) if existing == *spec => Ok(()),
            _ => Err(StoreError::Duplicate {
                key: DuplicateKey::Constraint(spec.id.clone()),
            }),
        }
    }

    fn get_spec(&self, id: &ConstraintId) -> Result<Option<ConstraintSpec>, StoreError> {
        read_json(&self.spec_path(id))
    }

    fn list_specs(&self, account_id: Option<&str>) -> Result<Vec<ConstraintSpec>, StoreError> {
        let mut specs: Vec<ConstraintSpec> = read_dir_json(&self.base_path.join(CONSTRAINTS))?;
        specs.retain(|s| account_id.is_none_or(|a| s.account_id == a));
        specs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(specs)
    }

    fn insert_consumer(&self, record: &ConsumerRecord) -> Result<(), StoreError> {
        let duplicate_consumer = || StoreError::Duplicate {
            key: DuplicateKey::Consumer {
                key: record.key.clone(),
                consumer_id: record.consumer_id.clone(),
            },
        };
        let path = self.consumer_path(&record.key, &record.consumer_id);
        self.locked(|| {
            if path.exists() {
                return Err(duplicate_consumer());
            }

            let order_path = self.order_path(&record.key, record.order);
            if !claim(&order_path, record.consumer_id.0.as_bytes())? {
                return Err(StoreError::Duplicate {
                    key: DuplicateKey::Order {
                        key: record.key.clone(),
                        order: record.order,
                    },
                });
            }

            match publish_json(&path, record) {
                Ok(true) => Ok(()),
                Ok(false) => {
                    fs::remove_file(&order_path)?;
                    Err(duplicate_consumer())
                }
                Err(error) => match remove_if_exists(&order_path) {
                    Ok(()) => Err(error),
                    Err(StoreError::Io(cleanup)) => Err(StoreError::Stranded {
                        error: Box::new(error),
                        path: order_path.display().to_string(),
                        cleanup,
                    }),
                    Err(e) => Err(e),
                },
            }
        })
    }

    /// Claims outlive records when a registration is interrupted, so the
    /// highest claim decides
    fn max_order(&self, key: &ConstraintKey) -> Result<u64, StoreError> {
        let claimed = claimed_orders(&self.key_dir(key).join("orders"))?;
        let recorded: Vec<ConsumerRecord> = read_dir_json(&self.key_dir(key).join("records"))?;
        Ok(claimed
            .into_iter()
            .chain(recorded.iter().map(|c| c.order))
            .max()
            .unwrap_or(0))
    }

    fn get_consumer(
        &self,
        key: &ConstraintKey,
        consumer_id: &ConsumerId,
    ) -> Result<Option<ConsumerRecord>, StoreError> {
        read_json(&self.consumer_path(key, consumer_id))
    }

    fn list_consumers(&self, filter: &ConsumerFilter) -> Result<Vec<ConsumerRecord>, StoreError> {
        let mut records = self.locked(|| {
            let mut records = Vec::new();
            for dir in self.record_dirs(filter)? {
                let found: Vec<ConsumerRecord> = read_dir_json(&dir)?;
                records.extend(found.into_iter().filter(|c| filter.matches(c)));
            }
            Ok(records)
        })?;
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
        let path = self.consumer_path(key, consumer_id);
        self.locked(|| {
            let mut record: ConsumerRecord = read_json(&path)?.ok_or_else(|| {
                StoreError::not_found("consumer", format!("{}/{}", key, consumer_id))
            })?;
            if !apply_transition(&mut record, from, to, at) {
                return Ok(false);
            }
            write_json(&path, &record)?;
            Ok(true)
        })
    }

    fn purge_finished(&self, key: &ConstraintKey) -> Result<usize, StoreError> {
        self.locked(|| {
            let finished: Vec<ConsumerRecord> =
                read_dir_json::<ConsumerRecord>(&self.key_dir(key).join("records"))?
                    .into_iter()
                    .filter(|c| c.state == ConsumerState::Finished)
                    .collect();
            for record in &finished {
                fs::remove_file(self.consumer_path(key, &record.consumer_id))?;
                remove_if_exists(&self.order_path(key, record.order))?;
            }
            Ok(finished.len())
        })
    }
}

impl BarrierStore for JsonStore {
    fn insert_barrier(&self, barrier: &BarrierInstance) -> Result<(), StoreError> {
        if publish_json(&self.barrier_path(&barrier.id), barrier)? {
            Ok(())
        } else {
            Err(StoreError::Duplicate {
                key: DuplicateKey::Barrier(barrier.id.clone()),
            })
        }
    }

    fn get_barrier(&self, id: &BarrierId) -> Result<Option<BarrierInstance>, StoreError> {
        read_json(&self.barrier_path(id))
    }

    fn list_barriers(&self, filter: &BarrierFilter) -> Result<Vec<BarrierInstance>, StoreError> {
        let mut barriers: Vec<BarrierInstance> = read_dir_json(&self.base_path.join(BARRIERS))?;
        barriers.retain(|b| filter.matches(b));
        barriers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(barriers)
    }

    fn update_standing(
        &self,
        id: &BarrierId,
        pipeline: &PipelineDescriptor,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.settle_barrier(id, BarrierState::Standing, pipeline, at)
    }

    fn settle_barrier(
        &self,
        id: &BarrierId,
        to: BarrierState,
        pipeline: &PipelineDescriptor,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let path = self.barrier_path(id);
        self.locked(|| {
            let mut barrier: BarrierInstance =
                read_json(&path)?.ok_or_else(|| StoreError::not_found("barrier", id))?;
            if !apply_barrier_update(&mut barrier, to, pipeline, at) {
                return Ok(false);
            }
            write_json(&path, &barrier)?;
            Ok(true)
        })
    }
}

/// File-name safe form of an id: anything outside `[A-Za-z0-9_-]` is percent-encoded
fn encode(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut values = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            // Removed between listing and reading
            if let Some(value) = read_json(&path)? {
                values.push(value);
            }
        }
    }
    Ok(values)
}

/// Orders of the `<n>.claim` files in `dir`
fn claimed_orders(dir: &Path) -> Result<Vec<u64>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut orders = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_none_or(|e| e != "claim") {
            continue;
        }
        if let Some(order) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse().ok())
        {
            orders.push(order);
        }
    }
    Ok(orders)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}-{}.tmp", std::process::id(), n));
    path.with_file_name(name)
}

fn write_tmp<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, StoreError> {
    ensure_parent(path)?;
    let tmp = tmp_path(path);
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(&tmp)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    Ok(tmp)
}

/// Create or replace `path` atomically
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = write_tmp(path, value)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Create `path` only if it does not exist yet; returns `false` if it did
fn publish_json<T: Serialize>(path: &Path, value: &T) -> Result<bool, StoreError> {
    let tmp = write_tmp(path, value)?;
    let linked = fs::hard_link(&tmp, path);
    fs::remove_file(&tmp)?;
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Create a claim file; returns `false` if someone else holds it
fn claim(path: &Path, owner: &[u8]) -> Result<bool, StoreError> {
    ensure_parent(path)?;
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(owner)?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
