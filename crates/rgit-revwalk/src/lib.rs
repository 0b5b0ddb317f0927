//! Commit ancestry traversal.
//!
//! Parent lookup, ancestor checks over the commit DAG, and history
//! listing in committer-timestamp order.

mod ancestry;
mod walk;

pub use ancestry::{commits_between, is_ancestor, parents};
pub use walk::{commits_before, AncestorIter};

use rgit_hash::ObjectId;

/// Errors from traversal operations.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("object is not a commit: {0}")]
    NotACommit(ObjectId),

    #[error(transparent)]
    Odb(#[from] rgit_odb::OdbError),

    #[error(transparent)]
    Repo(#[from] rgit_repo::RepoError),

    #[error(transparent)]
    Object(#[from] rgit_object::ObjectError),
}
