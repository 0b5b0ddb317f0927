use std::path::PathBuf;

use rgit_hash::ObjectId;
use rgit_object::ObjectKind;

/// Errors from repository-level operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository: {0}")]
    NotFound(PathBuf),

    #[error("object {id} is a {actual}, expected {expected}")]
    WrongKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("object {0} has no payload")]
    MetaOnly(ObjectId),

    #[error(transparent)]
    Odb(#[from] rgit_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] rgit_ref::RefError),

    #[error(transparent)]
    Object(#[from] rgit_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] rgit_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
