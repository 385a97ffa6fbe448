// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resuming suspended executions and reporting usage

mod noop;

pub use noop::NoOpNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use muster_core::ConstraintUsage;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("waiter not found: {0}")]
    WaiterNotFound(String),
    #[error("notification failed: {0}")]
    Failed(String),
}

/// How a suspended execution should continue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSignal {
    /// Permits were granted or the barrier went down
    Proceed,
    /// The barrier will never go down
    Fail { reason: String },
}

impl ResumeSignal {
    pub fn fail(reason: impl Into<String>) -> Self {
        ResumeSignal::Fail {
            reason: reason.into(),
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, ResumeSignal::Proceed)
    }
}

impl std::fmt::Display for ResumeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResumeSignal::Proceed => write!(f, "proceed"),
            ResumeSignal::Fail { reason } => write!(f, "fail: {}", reason),
        }
    }
}

/// Adapter that wakes up suspended executions
///
/// Delivery is at-least-once; receivers must tolerate duplicates.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Resume the execution `waiter_id`
    async fn resume(&self, waiter_id: &str, signal: ResumeSignal) -> Result<(), NotifyError>;

    /// Publish current constraint usage
    async fn report_usage(&self, usage: &[ConstraintUsage]) -> Result<(), NotifyError>;
}
