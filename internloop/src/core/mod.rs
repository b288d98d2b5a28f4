//! Deterministic, pure logic shared by the scheduler and verification loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod invariants;
pub mod selector;
pub mod types;
