//! CLI command implementations.

pub mod dump;
pub mod invoke;
pub mod state;
