// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives for concurrently running executions
//!
//! This module provides:
//! - **Constraint** - Capacity-bounded admission of consumers per resource unit
//! - **Forcer** - Arrival state of an execution subtree
//! - **Barrier** - Rendezvous of sibling pipeline tracks

pub mod barrier;
pub mod constraint;
pub mod consumer;
pub mod forcer;

pub use barrier::{BarrierInstance, BarrierState, PipelineDescriptor, WorkflowDescriptor};
pub use constraint::{ActiveConsumer, Constraint, ConstraintSpec, ConstraintUsage, Strategy};
pub use consumer::{ConstraintKey, ConsumerRecord, ConsumerState};
pub use forcer::{push_down, Forcer, ForcerMetadata, ForcerState};
