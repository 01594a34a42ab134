//! Provided store backends.
//!
//! Any type implementing the key-value contract in [`crate::source`] can act
//! as the secondary store; these are the backends the crate ships with.

pub mod file;
pub mod memory;
pub mod moka;
