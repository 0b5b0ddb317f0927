//! Loose object reading.
//!
//! Each loose object lives at `objects/XX/YYYY...` where `XX` is the first
//! byte of the id in hex and `YYYY...` is the rest. The file content is
//! zlib-compressed `"<type> <size>\0<payload>"`.

mod read;
mod stream;

pub use stream::LooseStream;

use std::path::{Path, PathBuf};

use rgit_hash::ObjectId;

/// Reader over a loose object directory (`objects/`).
pub struct LooseStore {
    objects_dir: PathBuf,
}

impl LooseStore {
    /// Open the loose store at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    /// The file path for a given id.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.objects_dir.join(id.loose_path())
    }

    /// The objects directory this store reads from.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

/// Errors from loose object reads.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("corrupt loose object {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("decompression error for {id}: {source}")]
    Decompress {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object parse error: {0}")]
    Object(#[from] rgit_object::ObjectError),
}
