// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op hierarchy adapter

use super::{HierarchyAdapter, HierarchyError};
use async_trait::async_trait;
use muster_core::ChildKind;

/// Hierarchy adapter that never finds a child.
///
/// Barriers built with it only see ids that were cached at creation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpHierarchyAdapter;

impl NoOpHierarchyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HierarchyAdapter for NoOpHierarchyAdapter {
    async fn find_child(
        &self,
        _parent_execution_id: &str,
        _kind: ChildKind,
        _static_id: &str,
    ) -> Result<Option<String>, HierarchyError> {
        Ok(None)
    }
}
