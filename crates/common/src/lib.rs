//! Shared conversation types and the error context helper used across the
//! umbra crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{ContentPart, Role, Turn, UserId},
};
