// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-core: pure coordination types and algorithms
//!
//! This crate provides:
//! - Resource constraints and their admission algorithm
//! - Forcer trees and barrier push-down
//! - Execution levels, references and statuses
//! - Clock and id abstractions

pub mod clock;
pub mod coordination;
pub mod error;
pub mod event;
pub mod execution;
pub mod id;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use coordination::{
    ActiveConsumer, BarrierInstance, BarrierState, Constraint, ConstraintKey, ConstraintSpec,
    ConstraintUsage, ConsumerRecord, ConsumerState, Forcer, ForcerState, PipelineDescriptor,
    Strategy, WorkflowDescriptor,
};
pub use error::CoordinationError;
pub use event::Event;
pub use execution::{
    ChildKind, ExecutionContext, ExecutionRef, ExecutionStatus, ExecutionStatuses, Level,
};
pub use id::{BarrierId, ConstraintId, ConsumerId, IdGen, SequentialIdGen, UuidIdGen};
