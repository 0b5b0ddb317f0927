//! Object identity for the rgit read-only git library.
//!
//! Provides the 20-byte SHA-1 `ObjectId`, hex encoding/decoding, and the
//! streaming `Hasher` used to recompute content hashes for verification.

mod error;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use hasher::Hasher;
pub use oid::ObjectId;
