// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the coordination engine

use crate::config::ConfigError;
use muster_adapters::{HierarchyError, NotifyError, StatusError};
use muster_core::{ConstraintId, ConstraintKey, ConsumerId, CoordinationError};
use muster_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Coordination(#[from] CoordinationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("status error: {0}")]
    Status(#[from] StatusError),
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("constraint not found: {0}")]
    ConstraintNotFound(ConstraintId),
    #[error("consumer {consumer_id} not found on {key}")]
    ConsumerNotFound {
        key: ConstraintKey,
        consumer_id: ConsumerId,
    },
    #[error("barrier not found: {0}")]
    BarrierNotFound(String),
    #[error("registration of {consumer_id} on {key} still conflicted after {attempts} attempts")]
    RegistrationConflict {
        key: ConstraintKey,
        consumer_id: ConsumerId,
        attempts: u32,
    },
}

impl EngineError {
    /// Configuration errors that retrying cannot fix
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Coordination(e) => e.is_fatal(),
            EngineError::Config(_) | EngineError::ConstraintNotFound(_) => true,
            _ => false,
        }
    }
}
