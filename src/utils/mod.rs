//! Utility modules shared across the crate.

pub mod exec;
pub mod path;
pub mod plural;
