// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::hierarchy::{HierarchyAdapter, HierarchyError};
use crate::notify::{NotifyAdapter, NotifyError, ResumeSignal};
use crate::status::{StatusAdapter, StatusError};
use async_trait::async_trait;
use muster_core::{ChildKind, ConstraintUsage, ExecutionRef, ExecutionStatus};
use tracing::Instrument;

/// Wrapper that adds tracing to any StatusAdapter
#[derive(Clone)]
pub struct TracedStatusAdapter<S> {
    inner: S,
}

impl<S> TracedStatusAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: StatusAdapter> StatusAdapter for TracedStatusAdapter<S> {
    async fn status(
        &self,
        execution: &ExecutionRef,
    ) -> Result<Option<ExecutionStatus>, StatusError> {
        let result = self.inner.status(execution).await;
        match &result {
            Ok(status) => tracing::trace!(%execution, status = ?status, "status checked"),
            Err(e) => tracing::warn!(%execution, error = %e, "status lookup failed"),
        }
        result
    }
}

/// Wrapper that adds tracing to any NotifyAdapter
#[derive(Clone)]
pub struct TracedNotifyAdapter<N> {
    inner: N,
}

impl<N> TracedNotifyAdapter<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: NotifyAdapter> NotifyAdapter for TracedNotifyAdapter<N> {
    async fn resume(&self, waiter_id: &str, signal: ResumeSignal) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify.resume", waiter_id, signal = %signal);

        async {
            tracing::info!("resuming");
            let start = std::time::Instant::now();
            let result = self.inner.resume(waiter_id, signal).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "resumed"),
                // Delivery is retried by later evaluations
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "resume failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn report_usage(&self, usage: &[ConstraintUsage]) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify.report_usage", keys = usage.len());

        async {
            let result = self.inner.report_usage(usage).await;
            match &result {
                Ok(()) => tracing::debug!("usage reported"),
                Err(e) => tracing::warn!(error = %e, "usage report failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any HierarchyAdapter
#[derive(Clone)]
pub struct TracedHierarchyAdapter<H> {
    inner: H,
}

impl<H> TracedHierarchyAdapter<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: HierarchyAdapter> HierarchyAdapter for TracedHierarchyAdapter<H> {
    async fn find_child(
        &self,
        parent_execution_id: &str,
        kind: ChildKind,
        static_id: &str,
    ) -> Result<Option<String>, HierarchyError> {
        let span = tracing::debug_span!(
            "hierarchy.find_child",
            parent = parent_execution_id,
            kind = %kind,
            static_id
        );

        async {
            let result = self
                .inner
                .find_child(parent_execution_id, kind, static_id)
                .await;
            match &result {
                Ok(Some(child)) => tracing::debug!(child, "child found"),
                Ok(None) => tracing::trace!("child not started"),
                Err(e) => tracing::warn!(error = %e, "lookup failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
