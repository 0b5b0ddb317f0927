use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rgit_hash::ObjectId;

use crate::error::RefError;
use crate::loose;
use crate::name::RefName;
use crate::packed::PackedRefs;
use crate::Reference;

/// Maximum depth when following symbolic ref chains.
const MAX_SYMREF_DEPTH: usize = 8;

/// Files-backend ref store: loose ref files plus `packed-refs`.
///
/// Loose refs shadow packed entries of the same name. All operations are
/// read-only; packed-refs is re-read per call so concurrent readers never
/// share mutable state.
pub struct FilesRefStore {
    git_dir: PathBuf,
}

impl FilesRefStore {
    /// Create a ref store over the given git directory.
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// The git directory this store reads from.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Resolve a name to a `Reference` without following symbolic chains.
    pub fn resolve(&self, name: &RefName) -> Result<Option<Reference>, RefError> {
        match loose::read_loose_ref(&self.git_dir, name)? {
            Some(r) => Ok(Some(r)),
            None => {
                let packed = PackedRefs::load(&self.git_dir)?;
                Ok(packed.find(name).map(|pr| Reference::Direct {
                    name: pr.name.clone(),
                    target: pr.id,
                }))
            }
        }
    }

    /// Resolve a name to its final object id, following symbolic chains.
    ///
    /// Returns `Ok(None)` when the ref (or the branch a symbolic ref
    /// points at) does not exist. A chain deeper than the fixed bound is
    /// corrupt.
    pub fn resolve_to_id(&self, name: &RefName) -> Result<Option<ObjectId>, RefError> {
        self.resolve_inner(name, 0)
    }

    fn resolve_inner(
        &self,
        name: &RefName,
        depth: usize,
    ) -> Result<Option<ObjectId>, RefError> {
        if depth > MAX_SYMREF_DEPTH {
            return Err(RefError::SymrefLoop(name.to_string()));
        }

        match loose::read_loose_ref(&self.git_dir, name)? {
            Some(Reference::Direct { target, .. }) => Ok(Some(target)),
            Some(Reference::Symbolic { target, .. }) => self.resolve_inner(&target, depth + 1),
            None => {
                let packed = PackedRefs::load(&self.git_dir)?;
                Ok(packed.find(name).map(|pr| pr.id))
            }
        }
    }

    /// Resolve a name to an id, reporting a missing ref as `NotFound`.
    pub fn resolve_required(&self, name: &RefName) -> Result<ObjectId, RefError> {
        self.resolve_to_id(name)?
            .ok_or_else(|| RefError::NotFound(name.to_string()))
    }

    /// Iterate refs under a prefix, loose entries shadowing packed ones,
    /// sorted by full ref name.
    pub fn iter(&self, prefix: &str) -> Result<Vec<Reference>, RefError> {
        let loose_names = loose::enumerate_loose_refs(&self.git_dir, prefix)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut refs: Vec<Reference> = Vec::new();

        for name in &loose_names {
            seen.insert(name.as_str().to_string());
            // A file may vanish between enumerate and read.
            if let Some(r) = loose::read_loose_ref(&self.git_dir, name)? {
                refs.push(r);
            }
        }

        let packed = PackedRefs::load(&self.git_dir)?;
        for pr in packed.refs() {
            if !pr.name.as_str().starts_with(prefix) {
                continue;
            }
            if seen.contains(pr.name.as_str()) {
                continue;
            }
            refs.push(Reference::Direct {
                name: pr.name.clone(),
                target: pr.id,
            });
        }

        refs.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(refs)
    }

    /// Short names (stems) of all refs under a prefix, e.g. branch names
    /// under `refs/heads/`.
    pub fn list_names(&self, prefix: &str) -> Result<Vec<String>, RefError> {
        let refs = self.iter(prefix)?;
        Ok(refs
            .iter()
            .map(|r| {
                r.name()
                    .as_str()
                    .strip_prefix(prefix)
                    .unwrap_or(r.name().as_str())
                    .to_string()
            })
            .collect())
    }

    /// Whether a ref exists, loose or packed.
    pub fn exists(&self, name: &RefName) -> Result<bool, RefError> {
        if loose::loose_ref_path(&self.git_dir, name).is_file() {
            return Ok(true);
        }
        let packed = PackedRefs::load(&self.git_dir)?;
        Ok(packed.find(name).is_some())
    }
}
