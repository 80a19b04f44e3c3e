//! # Marbles Testkit
//!
//! Test utilities for the marble registry.
//!
//! This crate provides:
//! - A test ledger pairing an in-memory store with a contract
//! - Transient payload builders for the mutating functions
//! - A store wrapper that injects storage failures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use marbles_testkit::prelude::*;
//!
//! let mut ledger = TestLedger::new();
//! ledger.create("m1", "blue", 5, "alice", 100).unwrap();
//! assert_eq!(ledger.read_general("m1").unwrap()["owner"], "alice");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
