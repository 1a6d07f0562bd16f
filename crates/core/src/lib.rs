//! Merkledrop Core Types
//!
//! This crate defines the fundamental data structures shared by the
//! commitment engine, the settlement state machine, and the tooling.

mod error;
mod types;

pub use error::*;
pub use types::*;
