//! # Wargame Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Ready-made matches on painted terrain
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
