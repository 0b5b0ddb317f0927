//! Unified object store.
//!
//! Routes object reads across the two physical tiers: loose files first
//! (a cheap stat), then each pack in deterministic order. Ref-delta bases
//! that live outside a pack are resolved back through the store.

mod search;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rgit_hash::ObjectId;
use rgit_loose::{LooseStore, LooseStream};
use rgit_object::{ObjectCache, RawObject};
use rgit_pack::PackFile;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("corrupt object {id}: {reason}")]
    Corrupt { id: ObjectId, reason: String },

    #[error(transparent)]
    Loose(#[from] rgit_loose::LooseError),

    #[error(transparent)]
    Pack(#[from] rgit_pack::PackError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Default number of objects kept in the read cache.
const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Read-only object database over `objects/`.
///
/// Safe to share across threads: packs and the loose store are immutable
/// after open, and the cache sits behind a mutex handing out clones.
pub struct ObjectStore {
    loose: LooseStore,
    packs: Vec<PackFile>,
    cache: Mutex<ObjectCache>,
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Open the object store at the given objects directory.
    ///
    /// Enumerates `pack/*.idx` eagerly; a pack that fails to open is an
    /// error rather than being silently skipped.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let loose = LooseStore::open(&objects_dir);
        let packs = discover_packs(&objects_dir)?;

        Ok(Self {
            loose,
            packs,
            cache: Mutex::new(ObjectCache::new(DEFAULT_CACHE_CAPACITY)),
            objects_dir,
        })
    }

    /// Read an object with its payload.
    pub fn read(&self, id: &ObjectId) -> Result<RawObject, OdbError> {
        search::find_object(self, id, false)?.ok_or(OdbError::NotFound(*id))
    }

    /// Read an object's kind and size without materialising the payload.
    pub fn read_meta(&self, id: &ObjectId) -> Result<RawObject, OdbError> {
        search::find_object(self, id, true)?.ok_or(OdbError::NotFound(*id))
    }

    /// Read an object through the LRU cache.
    ///
    /// Entries are value-semantic: the caller gets a clone that stays valid
    /// regardless of later evictions.
    pub fn read_cached(&self, id: &ObjectId) -> Result<RawObject, OdbError> {
        {
            let mut cache = self.cache.lock().expect("object cache poisoned");
            if let Some(obj) = cache.get(id) {
                return Ok(obj.clone());
            }
        }

        let obj = self.read(id)?;

        let mut cache = self.cache.lock().expect("object cache poisoned");
        cache.insert(*id, obj.clone());
        Ok(obj)
    }

    /// Check whether an object exists in any tier (no inflation).
    pub fn contains(&self, id: &ObjectId) -> bool {
        if self.loose.contains(id) {
            return true;
        }
        self.packs.iter().any(|p| p.contains(id))
    }

    /// Open a streaming reader for a loose object's payload.
    ///
    /// Returns `Ok(None)` when the object is not stored loose; packed
    /// objects must be read eagerly.
    pub fn stream_loose(&self, id: &ObjectId) -> Result<Option<LooseStream>, OdbError> {
        Ok(self.loose.stream(id)?)
    }

    /// The loose-object tier.
    pub fn loose(&self) -> &LooseStore {
        &self.loose
    }

    /// The open packs, in lookup order.
    pub fn packs(&self) -> &[PackFile] {
        &self.packs
    }

    /// The objects directory this store reads from.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// All ids known to the packs, in per-pack index order.
    pub fn packed_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.packs
            .iter()
            .flat_map(|p| p.index().iter().map(|(id, _)| id))
    }
}

/// Discover packs under `objects/pack`, ordered by index path.
fn discover_packs(objects_dir: &Path) -> Result<Vec<PackFile>, OdbError> {
    let pack_dir = objects_dir.join("pack");
    if !pack_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut idx_paths: Vec<PathBuf> = std::fs::read_dir(&pack_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "idx"))
        .collect();
    idx_paths.sort();

    let mut packs = Vec::with_capacity(idx_paths.len());
    for idx_path in idx_paths {
        packs.push(PackFile::open(idx_path.with_extension("pack"))?);
    }
    Ok(packs)
}
