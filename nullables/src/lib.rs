//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies are abstracted behind traits in `corechain-types`.
//! This crate provides test-friendly implementations that return
//! deterministic values and can be controlled programmatically.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;

pub use clock::NullClock;
