//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - An in-memory store implementing every repository trait
//! - A builder for `AppState` backed by that store

mod app_state_builder;
mod factories;
mod store_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use store_mocks::*;
