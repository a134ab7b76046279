//! Test-only crate: shared helpers for pool integration tests.

pub mod helpers;
