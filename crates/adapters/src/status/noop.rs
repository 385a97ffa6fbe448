// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op status adapter

use super::{StatusAdapter, StatusError};
use async_trait::async_trait;
use muster_core::{ExecutionRef, ExecutionStatus};

/// Status adapter that knows no executions.
///
/// Nothing is ever released or resolved through it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpStatusAdapter;

impl NoOpStatusAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StatusAdapter for NoOpStatusAdapter {
    async fn status(
        &self,
        _execution: &ExecutionRef,
    ) -> Result<Option<ExecutionStatus>, StatusError> {
        Ok(None)
    }
}
