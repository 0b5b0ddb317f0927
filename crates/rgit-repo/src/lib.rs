//! The repository handle: one place that owns the object store and the
//! reference resolver and exposes the typed read operations.

mod error;

pub use error::RepoError;

use std::path::{Path, PathBuf};

use bstr::BStr;
use rgit_hash::ObjectId;
use rgit_loose::LooseStream;
use rgit_object::{Commit, ObjectKind, RawObject, Tag, Tree, TreeEntry};
use rgit_odb::ObjectStore;
use rgit_ref::{FilesRefStore, RefName, Reference};

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// HEAD is a symbolic ref; carries the final path segment of the
    /// branch name.
    Branch(String),
    /// HEAD holds a bare object id.
    Detached(ObjectId),
}

/// An open repository.
///
/// Owns the file handles and mappings of its object store; dropping the
/// repository releases them all. Read operations take `&self` and may be
/// called from multiple threads.
pub struct Repository {
    git_dir: PathBuf,
    odb: ObjectStore,
    refs: FilesRefStore,
}

impl Repository {
    /// Open a repository.
    ///
    /// `path` may point at a git directory (contains `HEAD` and
    /// `objects/`, the bare layout) or at a working tree whose `.git`
    /// subdirectory is the git directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();

        let git_dir = if path.join("HEAD").is_file() && path.join("objects").is_dir() {
            path.to_path_buf()
        } else if path.join(".git").is_dir() {
            path.join(".git")
        } else {
            return Err(RepoError::NotFound(path.to_path_buf()));
        };

        let odb = ObjectStore::open(git_dir.join("objects"))?;
        let refs = FilesRefStore::new(&git_dir);

        Ok(Self {
            git_dir,
            odb,
            refs,
        })
    }

    /// The git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The object store.
    pub fn odb(&self) -> &ObjectStore {
        &self.odb
    }

    /// The reference store.
    pub fn refs(&self) -> &FilesRefStore {
        &self.refs
    }

    // --- Objects ---

    /// Read an object. With `meta_only` the payload is not materialised.
    pub fn get_object(&self, id: &ObjectId, meta_only: bool) -> Result<RawObject, RepoError> {
        if meta_only {
            Ok(self.odb.read_meta(id)?)
        } else {
            Ok(self.odb.read(id)?)
        }
    }

    /// Read a blob's payload bytes.
    pub fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>, RepoError> {
        let obj = self.read_kind(id, ObjectKind::Blob)?;
        obj.data.ok_or(RepoError::MetaOnly(*id))
    }

    /// Open a streaming reader over a blob stored loose.
    ///
    /// Returns `Ok(None)` when the blob is packed; packed payloads are
    /// only available through [`read_blob`](Self::read_blob).
    pub fn blob_stream(&self, id: &ObjectId) -> Result<Option<LooseStream>, RepoError> {
        Ok(self.odb.stream_loose(id)?)
    }

    /// Read and parse a commit.
    pub fn read_commit(&self, id: &ObjectId) -> Result<Commit, RepoError> {
        let obj = self.read_kind(id, ObjectKind::Commit)?;
        let data = obj.data.ok_or(RepoError::MetaOnly(*id))?;
        Ok(Commit::parse(&data)?)
    }

    /// Read and parse a tree.
    pub fn read_tree(&self, id: &ObjectId) -> Result<Tree, RepoError> {
        let obj = self.read_kind(id, ObjectKind::Tree)?;
        let data = obj.data.ok_or(RepoError::MetaOnly(*id))?;
        Ok(Tree::parse(&data)?)
    }

    /// Read and parse an annotated tag.
    pub fn read_tag(&self, id: &ObjectId) -> Result<Tag, RepoError> {
        let obj = self.read_kind(id, ObjectKind::Tag)?;
        let data = obj.data.ok_or(RepoError::MetaOnly(*id))?;
        Ok(Tag::parse(&data)?)
    }

    /// Walk a tree depth-first, calling `visit` with each `(path_prefix,
    /// entry)` pair. Subtrees are loaded through the object store.
    pub fn walk_tree(
        &self,
        id: &ObjectId,
        visit: &mut impl FnMut(&BStr, &TreeEntry),
    ) -> Result<(), RepoError> {
        let tree = self.read_tree(id)?;
        tree.walk(&mut |sub_id| self.read_tree(sub_id), visit)
    }

    /// Resolve an id to a commit, peeling annotated tags as needed.
    pub fn peel_to_commit(&self, id: &ObjectId) -> Result<Commit, RepoError> {
        let mut current = *id;
        loop {
            let obj = self.odb.read_cached(&current)?;
            match obj.kind {
                ObjectKind::Commit => {
                    let data = obj.data.ok_or(RepoError::MetaOnly(current))?;
                    return Ok(Commit::parse(&data)?);
                }
                ObjectKind::Tag => {
                    let data = obj.data.ok_or(RepoError::MetaOnly(current))?;
                    let tag = Tag::parse(&data)?;
                    current = tag.target;
                }
                actual => {
                    return Err(RepoError::WrongKind {
                        id: current,
                        expected: ObjectKind::Commit,
                        actual,
                    })
                }
            }
        }
    }

    fn read_kind(&self, id: &ObjectId, expected: ObjectKind) -> Result<RawObject, RepoError> {
        let obj = self.odb.read(id)?;
        if obj.kind != expected {
            return Err(RepoError::WrongKind {
                id: *id,
                expected,
                actual: obj.kind,
            });
        }
        Ok(obj)
    }

    // --- References ---

    /// Resolve a ref name (e.g. `refs/heads/master`, `HEAD`) to an id.
    pub fn resolve_ref(&self, name: &str) -> Result<ObjectId, RepoError> {
        let name = RefName::new(name)?;
        Ok(self.refs.resolve_required(&name)?)
    }

    /// Branch names under `refs/heads/`, loose and packed merged.
    pub fn list_branches(&self) -> Result<Vec<String>, RepoError> {
        Ok(self.refs.list_names("refs/heads/")?)
    }

    /// Tag names under `refs/tags/`, loose and packed merged.
    pub fn list_tags(&self) -> Result<Vec<String>, RepoError> {
        Ok(self.refs.list_names("refs/tags/")?)
    }

    /// Whether a branch of the given short name exists.
    pub fn is_branch(&self, name: &str) -> Result<bool, RepoError> {
        let name = RefName::new(format!("refs/heads/{name}"))?;
        Ok(self.refs.exists(&name)?)
    }

    /// Whether a tag of the given short name exists.
    pub fn is_tag(&self, name: &str) -> Result<bool, RepoError> {
        let name = RefName::new(format!("refs/tags/{name}"))?;
        Ok(self.refs.exists(&name)?)
    }

    /// Where HEAD points: the current branch's final path segment, or the
    /// bare id when detached.
    pub fn head(&self) -> Result<Head, RepoError> {
        let head = RefName::new("HEAD")?;
        match self.refs.resolve(&head)? {
            Some(Reference::Symbolic { target, .. }) => {
                let name = target.as_str();
                let segment = name.rsplit('/').next().unwrap_or(name);
                Ok(Head::Branch(segment.to_string()))
            }
            Some(Reference::Direct { target, .. }) => Ok(Head::Detached(target)),
            None => Err(RepoError::Ref(rgit_ref::RefError::NotFound(
                "HEAD".into(),
            ))),
        }
    }

    /// Resolve HEAD all the way to a commit id, if the current branch has
    /// one.
    pub fn head_id(&self) -> Result<Option<ObjectId>, RepoError> {
        let head = RefName::new("HEAD")?;
        Ok(self.refs.resolve_to_id(&head)?)
    }
}
