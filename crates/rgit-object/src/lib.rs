//! Git object model for the rgit read-only git library.
//!
//! `RawObject` is what the storage tiers hand out: a kind, an inflated
//! size, and optionally the payload bytes (absent for meta-only reads).
//! The `Commit`, `Tree`, and `Tag` parsers turn payloads into typed values.

pub mod cache;
mod commit;
pub mod header;
mod tag;
mod tree;

pub use cache::ObjectCache;
pub use commit::Commit;
pub use tag::Tag;
pub use tree::{EntryMode, Tree, TreeEntry};

use bstr::BString;
use rgit_hash::HashError;

/// Errors produced by object parsing.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object type: {0}")]
    InvalidType(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("truncated object: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: usize, reason: String },

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("invalid tag: missing '{field}' header")]
    MissingTagField { field: &'static str },

    #[error("invalid file mode: {0}")]
    InvalidFileMode(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The four kinds of git objects.
///
/// The delta encodings used inside packfiles are internal to pack decoding
/// and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    /// Parse from the type string in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"commit" => Ok(Self::Commit),
            b"tree" => Ok(Self::Tree),
            b"blob" => Ok(Self::Blob),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidType(BString::from(s))),
        }
    }

    /// The canonical type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// A materialised object as read from storage.
///
/// `size` is the inflated payload length. `data` is `None` when the caller
/// asked for metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub size: u64,
    pub data: Option<Vec<u8>>,
}

impl RawObject {
    /// Build a full object from its payload.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self {
            kind,
            size: data.len() as u64,
            data: Some(data),
        }
    }

    /// Build a metadata-only object.
    pub fn meta(kind: ObjectKind, size: u64) -> Self {
        Self {
            kind,
            size,
            data: None,
        }
    }

    /// The payload bytes, if materialised.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}
