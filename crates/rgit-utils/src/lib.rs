//! Foundation utilities shared across the rgit crates.
//!
//! Currently this is the date/identity layer: `GitDate` for git's
//! `<seconds> <±HHMM>` timestamps and `Signature` for authorship records.

pub mod date;
mod error;

pub use date::{GitDate, Signature};
pub use error::UtilError;

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, UtilError>;
