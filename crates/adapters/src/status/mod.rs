// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution status lookups

mod noop;

pub use noop::NoOpStatusAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStatusAdapter;

use async_trait::async_trait;
use muster_core::{ExecutionRef, ExecutionStatus, ExecutionStatuses};
use thiserror::Error;

/// Errors from status lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("status service unavailable: {0}")]
    Unavailable(String),
    #[error("status lookup failed for {execution}: {message}")]
    LookupFailed {
        execution: ExecutionRef,
        message: String,
    },
}

/// Adapter reporting the current status of executions
#[async_trait]
pub trait StatusAdapter: Clone + Send + Sync + 'static {
    /// Current status, `None` when the execution is unknown
    async fn status(&self, execution: &ExecutionRef)
        -> Result<Option<ExecutionStatus>, StatusError>;

    /// Statuses of several executions; unknown ones are left out
    async fn statuses(
        &self,
        executions: &[ExecutionRef],
    ) -> Result<ExecutionStatuses, StatusError> {
        let mut statuses = ExecutionStatuses::new();
        for execution in executions {
            if let Some(status) = self.status(execution).await? {
                statuses.insert(execution.clone(), status);
            }
        }
        Ok(statuses)
    }
}
