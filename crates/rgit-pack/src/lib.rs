//! Packfile reading: the `.idx` v2 index, entry decoding, and delta
//! resolution.
//!
//! A pack stores many objects in one file, most of them as deltas against
//! other entries. The companion index maps an object id to its byte offset
//! through a fan-out table and binary search.

pub mod delta;
pub mod entry;
mod index;
mod pack;

pub use index::{PackIndex, PackIndexIter};
pub use pack::PackFile;

use rgit_hash::ObjectId;

/// Errors from pack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("invalid delta at offset {offset}: {reason}")]
    InvalidDelta { offset: u64, reason: String },

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("delta chain too deep (>{max_depth} levels) at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error("corrupt pack entry at offset {0}")]
    CorruptEntry(u64),

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] rgit_hash::HashError),
}

/// Kind of a packed entry, before delta resolution.
///
/// The two delta variants are internal to pack decoding; resolved results
/// always carry one of the four object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryKind {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta whose base lives at an earlier offset in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta whose base is named by object id (possibly in another pack).
    RefDelta { base_id: ObjectId },
}

impl PackEntryKind {
    /// The object kind, for non-delta entries.
    pub fn object_kind(self) -> Option<rgit_object::ObjectKind> {
        match self {
            Self::Commit => Some(rgit_object::ObjectKind::Commit),
            Self::Tree => Some(rgit_object::ObjectKind::Tree),
            Self::Blob => Some(rgit_object::ObjectKind::Blob),
            Self::Tag => Some(rgit_object::ObjectKind::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\xfftOc"
pub const IDX_VERSION: u32 = 2;

/// Maximum delta chain depth before decoding bails out.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 512;
