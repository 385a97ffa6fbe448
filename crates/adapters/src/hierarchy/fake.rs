// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake hierarchy adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{HierarchyAdapter, HierarchyError};
use async_trait::async_trait;
use muster_core::ChildKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Recorded lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyCall {
    pub parent_execution_id: String,
    pub kind: ChildKind,
    pub static_id: String,
}

#[derive(Default)]
struct FakeHierarchyState {
    children: HashMap<(String, ChildKind, String), String>,
    calls: Vec<HierarchyCall>,
}

/// Fake hierarchy adapter with children registered by the test
#[derive(Clone, Default)]
pub struct FakeHierarchyAdapter {
    inner: Arc<Mutex<FakeHierarchyState>>,
}

impl FakeHierarchyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `child_execution_id` as the `kind` child of `parent` for `static_id`
    pub fn add_child(
        &self,
        parent: impl Into<String>,
        kind: ChildKind,
        static_id: impl Into<String>,
        child_execution_id: impl Into<String>,
    ) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.children.insert(
            (parent.into(), kind, static_id.into()),
            child_execution_id.into(),
        );
    }

    pub fn calls(&self) -> Vec<HierarchyCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }
}

#[async_trait]
impl HierarchyAdapter for FakeHierarchyAdapter {
    async fn find_child(
        &self,
        parent_execution_id: &str,
        kind: ChildKind,
        static_id: &str,
    ) -> Result<Option<String>, HierarchyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(HierarchyCall {
            parent_execution_id: parent_execution_id.to_string(),
            kind,
            static_id: static_id.to_string(),
        });
        Ok(inner
            .children
            .get(&(parent_execution_id.to_string(), kind, static_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
