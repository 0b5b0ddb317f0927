//! Packfile reading and delta-chain resolution.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::bufread::ZlibDecoder;
use memmap2::Mmap;
use rgit_hash::ObjectId;
use rgit_object::{ObjectKind, RawObject};

use crate::delta;
use crate::entry::{parse_entry_header, PackEntry};
use crate::index::PackIndex;
use crate::{
    PackEntryKind, PackError, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE, PACK_SIGNATURE,
    PACK_VERSION,
};

/// A memory-mapped packfile together with its index.
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
}

impl PackFile {
    /// Open a `.pack` file and its companion `.idx`.
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::InvalidHeader("file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let index = PackIndex::open(&idx_path)?;
        if index.num_objects() != num_objects {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
        })
    }

    /// Read an object by id. Returns `None` if the id is not in this pack.
    ///
    /// With `meta_only`, payloads are not materialised: non-delta entries
    /// skip inflation entirely and delta entries report the result size
    /// declared by their script.
    pub fn read(&self, id: &ObjectId, meta_only: bool) -> Result<Option<RawObject>, PackError> {
        self.read_with_resolver(id, meta_only, |_| None)
    }

    /// Read an object by id, consulting `resolver` for ref-delta bases that
    /// live outside this pack (another pack or the loose store).
    pub fn read_with_resolver(
        &self,
        id: &ObjectId,
        meta_only: bool,
        resolver: impl Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<Option<RawObject>, PackError> {
        match self.index.lookup(id) {
            Some(offset) => self
                .read_at_offset_with(offset, meta_only, &resolver)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Read the entry at a known pack offset.
    pub fn read_at_offset(&self, offset: u64, meta_only: bool) -> Result<RawObject, PackError> {
        self.read_at_offset_with(offset, meta_only, &|_| None)
    }

    fn read_at_offset_with(
        &self,
        offset: u64,
        meta_only: bool,
        resolver: &dyn Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<RawObject, PackError> {
        if meta_only {
            return self.read_meta_at_offset(offset, resolver);
        }

        // Walk the delta chain iteratively, collecting scripts innermost
        // first, then apply them against the base in reverse.
        let mut chain: Vec<Vec<u8>> = Vec::new();
        let mut current_offset = offset;

        for _ in 0..MAX_DELTA_CHAIN_DEPTH {
            let entry = self.entry_at(current_offset)?;

            match entry.kind {
                PackEntryKind::Commit
                | PackEntryKind::Tree
                | PackEntryKind::Blob
                | PackEntryKind::Tag => {
                    let kind = non_delta_kind(entry.kind, current_offset)?;
                    let mut data = self.inflate_entry(&entry, current_offset)?;
                    for script in chain.iter().rev() {
                        data = delta::apply_delta(&data, script)?;
                    }
                    return Ok(RawObject::new(kind, data));
                }
                PackEntryKind::OfsDelta { base_offset } => {
                    chain.push(self.inflate_entry(&entry, current_offset)?);
                    current_offset = base_offset;
                }
                PackEntryKind::RefDelta { base_id } => {
                    chain.push(self.inflate_entry(&entry, current_offset)?);
                    if let Some(base_offset) = self.index.lookup(&base_id) {
                        current_offset = base_offset;
                    } else {
                        // Base lives outside this pack; resolution always
                        // demands data.
                        let base =
                            resolver(&base_id).ok_or(PackError::MissingBase(base_id))?;
                        let mut data =
                            base.data.ok_or(PackError::MissingBase(base_id))?;
                        for script in chain.iter().rev() {
                            data = delta::apply_delta(&data, script)?;
                        }
                        return Ok(RawObject::new(base.kind, data));
                    }
                }
            }
        }

        Err(PackError::DeltaChainTooDeep {
            offset,
            max_depth: MAX_DELTA_CHAIN_DEPTH,
        })
    }

    /// Meta-only read: kind and resolved size, no payload.
    fn read_meta_at_offset(
        &self,
        offset: u64,
        resolver: &dyn Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<RawObject, PackError> {
        let entry = self.entry_at(offset)?;

        match entry.kind {
            PackEntryKind::Commit
            | PackEntryKind::Tree
            | PackEntryKind::Blob
            | PackEntryKind::Tag => {
                let kind = non_delta_kind(entry.kind, offset)?;
                Ok(RawObject::meta(kind, entry.inflated_size))
            }
            PackEntryKind::OfsDelta { base_offset } => {
                let script = self.inflate_entry(&entry, offset)?;
                let (_, result_size) = delta::delta_sizes(&script)?;
                let kind = self.kind_at_offset(base_offset, resolver)?;
                Ok(RawObject::meta(kind, result_size))
            }
            PackEntryKind::RefDelta { base_id } => {
                let script = self.inflate_entry(&entry, offset)?;
                let (_, result_size) = delta::delta_sizes(&script)?;
                let kind = match self.index.lookup(&base_id) {
                    Some(base_offset) => self.kind_at_offset(base_offset, resolver)?,
                    None => {
                        resolver(&base_id)
                            .ok_or(PackError::MissingBase(base_id))?
                            .kind
                    }
                };
                Ok(RawObject::meta(kind, result_size))
            }
        }
    }

    /// Resolve the object kind at an offset by walking entry headers only.
    fn kind_at_offset(
        &self,
        offset: u64,
        resolver: &dyn Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<ObjectKind, PackError> {
        let mut current = offset;
        for _ in 0..MAX_DELTA_CHAIN_DEPTH {
            let entry = self.entry_at(current)?;
            match entry.kind {
                PackEntryKind::Commit
                | PackEntryKind::Tree
                | PackEntryKind::Blob
                | PackEntryKind::Tag => return non_delta_kind(entry.kind, current),
                PackEntryKind::OfsDelta { base_offset } => current = base_offset,
                PackEntryKind::RefDelta { base_id } => match self.index.lookup(&base_id) {
                    Some(base_offset) => current = base_offset,
                    None => {
                        return Ok(resolver(&base_id)
                            .ok_or(PackError::MissingBase(base_id))?
                            .kind)
                    }
                },
            }
        }
        Err(PackError::DeltaChainTooDeep {
            offset,
            max_depth: MAX_DELTA_CHAIN_DEPTH,
        })
    }

    /// Whether this pack contains the given id (index lookup only).
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    /// Number of objects in this pack.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// The companion index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Path to the `.pack` file.
    pub fn path(&self) -> &Path {
        &self.pack_path
    }

    fn entry_at(&self, offset: u64) -> Result<PackEntry, PackError> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(PackError::CorruptEntry(offset));
        }
        parse_entry_header(&self.data[start..], offset)
    }

    /// Inflate the compressed bytes following an entry header; the result
    /// must match the size declared by the header exactly.
    fn inflate_entry(&self, entry: &PackEntry, offset: u64) -> Result<Vec<u8>, PackError> {
        let start = entry.data_offset as usize;
        if start > self.data.len() {
            return Err(PackError::CorruptEntry(offset));
        }
        let mut decoder = ZlibDecoder::new(&self.data[start..]);
        let mut buf = Vec::with_capacity(entry.inflated_size as usize);
        decoder
            .read_to_end(&mut buf)
            .map_err(|_| PackError::CorruptEntry(offset))?;
        if buf.len() as u64 != entry.inflated_size {
            return Err(PackError::CorruptEntry(offset));
        }
        Ok(buf)
    }
}

fn non_delta_kind(kind: PackEntryKind, offset: u64) -> Result<ObjectKind, PackError> {
    kind.object_kind().ok_or(PackError::CorruptEntry(offset))
}
