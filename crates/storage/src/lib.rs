// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage for constraints, consumers and barriers
//!
//! Both backends enforce the unique keys the coordination engine relies on:
//! a consumer id and an order are each unique within a constraint key, and
//! barrier ids are unique. State changes go through conditional updates.

mod error;
mod json;
mod memory;
mod store;


pub use error::{DuplicateKey, StoreError};
pub use json::JsonStore;
pub use memory::MemoryStore;
pub use store::{BarrierFilter, BarrierStore, ConstraintStore, ConsumerFilter};
