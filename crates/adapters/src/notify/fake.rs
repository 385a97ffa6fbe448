// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notify adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError, ResumeSignal};
use async_trait::async_trait;
use muster_core::ConstraintUsage;
use std::sync::{Arc, Mutex};

/// Recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyCall {
    Resume {
        waiter_id: String,
        signal: ResumeSignal,
    },
    ReportUsage {
        usage: Vec<ConstraintUsage>,
    },
}

#[derive(Default)]
struct FakeNotifyState {
    calls: Vec<NotifyCall>,
    failing: bool,
}

/// Fake notify adapter for testing
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    inner: Arc<Mutex<FakeNotifyState>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications, including failed attempts
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Recorded resumes as `(waiter, signal)` pairs
    pub fn resumes(&self) -> Vec<(String, ResumeSignal)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NotifyCall::Resume { waiter_id, signal } => Some((waiter_id, signal)),
                NotifyCall::ReportUsage { .. } => None,
            })
            .collect()
    }

    /// Most recent usage report
    pub fn last_usage(&self) -> Option<Vec<ConstraintUsage>> {
        self.calls().into_iter().rev().find_map(|call| match call {
            NotifyCall::ReportUsage { usage } => Some(usage),
            NotifyCall::Resume { .. } => None,
        })
    }

    /// Make every call fail (after recording it)
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clear();
    }

    fn record(&self, call: NotifyCall) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(call);
        if inner.failing {
            return Err(NotifyError::Failed("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn resume(&self, waiter_id: &str, signal: ResumeSignal) -> Result<(), NotifyError> {
        self.record(NotifyCall::Resume {
            waiter_id: waiter_id.to_string(),
            signal,
        })
    }

    async fn report_usage(&self, usage: &[ConstraintUsage]) -> Result<(), NotifyError> {
        self.record(NotifyCall::ReportUsage {
            usage: usage.to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
