// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery of child executions

mod noop;

pub use noop::NoOpHierarchyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeHierarchyAdapter, HierarchyCall};

use async_trait::async_trait;
use muster_core::ChildKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("hierarchy service unavailable: {0}")]
    Unavailable(String),
    #[error("lookup of {kind} {static_id} under {parent} failed: {message}")]
    LookupFailed {
        parent: String,
        kind: ChildKind,
        static_id: String,
        message: String,
    },
}

/// Adapter that finds the execution started for a static definition
#[async_trait]
pub trait HierarchyAdapter: Clone + Send + Sync + 'static {
    /// Execution id of the `kind` child of `parent_execution_id` defined by
    /// `static_id`, or `None` if it has not started yet
    async fn find_child(
        &self,
        parent_execution_id: &str,
        kind: ChildKind,
        static_id: &str,
    ) -> Result<Option<String>, HierarchyError>;
}
