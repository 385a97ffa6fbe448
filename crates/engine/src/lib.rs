// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Muster coordination engine
//!
//! Resource constraints admit a bounded number of concurrent consumers;
//! barriers hold concurrent pipeline tracks until all of them arrive.

mod assembler;
mod barrier;
mod config;
mod error;
mod registry;
mod report;
mod service;
mod sweeper;

#[cfg(test)]
mod test_helpers;

pub use assembler::{BarrierAssembler, BarrierRef, PipelinePlan, StagePlan};
pub use barrier::{Barrier, BarrierUpdate};
pub use config::{ConfigError, CoordinationConfig};
pub use error::EngineError;
pub use registry::{AcquireRequest, ConstraintRegistry, Registration};
pub use report::{SweepFailure, SweepReport};
pub use service::{CoordinationService, ServiceDeps};
pub use sweeper::Sweeper;
