// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake status adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{StatusAdapter, StatusError};
use async_trait::async_trait;
use muster_core::{ExecutionRef, ExecutionStatus};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeStatusState {
    statuses: HashMap<ExecutionRef, ExecutionStatus>,
    failing: HashSet<ExecutionRef>,
    lookups: Vec<ExecutionRef>,
}

/// Fake status adapter with statuses set by the test
#[derive(Clone, Default)]
pub struct FakeStatusAdapter {
    inner: Arc<Mutex<FakeStatusState>>,
}

impl FakeStatusAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, execution: ExecutionRef, status: ExecutionStatus) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.statuses.insert(execution, status);
    }

    /// Make lookups of `execution` fail until cleared
    pub fn fail(&self, execution: ExecutionRef) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.failing.insert(execution);
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.failing.clear();
    }

    /// Every execution looked up so far
    pub fn lookups(&self) -> Vec<ExecutionRef> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.lookups.clone()
    }
}

#[async_trait]
impl StatusAdapter for FakeStatusAdapter {
    async fn status(
        &self,
        execution: &ExecutionRef,
    ) -> Result<Option<ExecutionStatus>, StatusError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.lookups.push(execution.clone());
        if inner.failing.contains(execution) {
            return Err(StatusError::LookupFailed {
                execution: execution.clone(),
                message: "injected failure".to_string(),
            });
        }
        Ok(inner.statuses.get(execution).copied())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
