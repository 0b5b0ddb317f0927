use std::path::PathBuf;

/// Errors from reference operations.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("invalid ref name: {0}")]
    InvalidName(String),

    #[error("ref not found: {0}")]
    NotFound(String),

    #[error("symbolic ref chain too deep at: {0}")]
    SymrefLoop(String),

    #[error("ref file is a symlink: {0}")]
    SymlinkRef(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error on {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] rgit_hash::HashError),
}
