// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the collaborators the coordination engine talks to
//!
//! - [`StatusAdapter`] looks up execution statuses
//! - [`NotifyAdapter`] resumes suspended executions and reports usage
//! - [`HierarchyAdapter`] discovers child executions of a parent

pub mod hierarchy;
pub mod notify;
pub mod status;
pub mod traced;

pub use hierarchy::{HierarchyAdapter, HierarchyError, NoOpHierarchyAdapter};
pub use notify::{NoOpNotifyAdapter, NotifyAdapter, NotifyError, ResumeSignal};
pub use status::{NoOpStatusAdapter, StatusAdapter, StatusError};
pub use traced::{TracedHierarchyAdapter, TracedNotifyAdapter, TracedStatusAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use hierarchy::{FakeHierarchyAdapter, HierarchyCall};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use status::FakeStatusAdapter;
