// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notify adapter for when nothing listens for resumes.

use super::{NotifyAdapter, NotifyError, ResumeSignal};
use async_trait::async_trait;
use muster_core::ConstraintUsage;

/// Notify adapter that drops every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifyAdapter;

impl NoOpNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn resume(&self, _waiter_id: &str, _signal: ResumeSignal) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn report_usage(&self, _usage: &[ConstraintUsage]) -> Result<(), NotifyError> {
        Ok(())
    }
}
