//! Deterministic, pure logic of the tracker engine.
//!
//! Core modules are free of I/O side effects. They operate on the in-memory
//! tracker tree and return deterministic outputs suitable for tests.

pub mod generator;
pub mod invariants;
pub mod path;
pub mod tracker;
pub mod types;
