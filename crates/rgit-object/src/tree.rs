use std::cmp::Ordering;

use bstr::{BStr, BString, ByteSlice, ByteVec};
use rgit_hash::ObjectId;

use crate::{ObjectError, ObjectKind};

/// File mode of a tree entry.
///
/// Git only ever writes these five modes; anything else in a tree payload
/// is corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Submodule link (160000)
    Gitlink,
    /// Subdirectory (40000)
    Tree,
}

impl EntryMode {
    /// Parse from the octal ASCII form used in tree payloads.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"100644" => Ok(Self::Regular),
            b"100755" => Ok(Self::Executable),
            b"120000" => Ok(Self::Symlink),
            b"160000" => Ok(Self::Gitlink),
            b"40000" => Ok(Self::Tree),
            _ => Err(ObjectError::InvalidFileMode(
                String::from_utf8_lossy(s).into(),
            )),
        }
    }

    /// The octal ASCII form git writes (no leading zero for trees).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Gitlink => "160000",
            Self::Tree => "40000",
        }
    }

    /// The raw numeric mode.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Gitlink => 0o160000,
            Self::Tree => 0o40000,
        }
    }

    /// The kind of object this entry points at.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Regular | Self::Executable | Self::Symlink => ObjectKind::Blob,
            Self::Gitlink => ObjectKind::Commit,
            Self::Tree => ObjectKind::Tree,
        }
    }

    /// Is this a subdirectory entry?
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }

    /// Is this a plain or executable file?
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }
}

/// A single entry in a tree payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: BString,
    pub id: ObjectId,
}

impl TreeEntry {
    /// The kind of object this entry points at.
    pub fn kind(&self) -> ObjectKind {
        self.mode.kind()
    }
}

/// Display ordering: directories before non-directories, then ascending by
/// name. Used only at the API boundary; payload order is left untouched.
pub fn display_cmp(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    match (a.mode.is_tree(), b.mode.is_tree()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

/// A parsed tree payload: an ordered directory listing.
///
/// Entries are kept in payload order, which git guarantees to be sorted by
/// name (directories comparing as if they had a trailing `/`). The parser
/// trusts this rather than re-verifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Parse tree content from its binary payload.
    ///
    /// Each entry is `<mode-ascii> <name>\0<20 raw id bytes>`.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let space_pos = content[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?
                + pos;

            let mode = EntryMode::from_bytes(&content[pos..space_pos])?;

            let name_start = space_pos + 1;
            let null_pos = content[name_start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: name_start,
                    reason: "missing null after name".into(),
                })?
                + name_start;
            let name = BString::from(&content[name_start..null_pos]);

            let id_start = null_pos + 1;
            let id_end = id_start + ObjectId::RAW_LEN;
            if id_end > content.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: id_start,
                    reason: "truncated object id".into(),
                });
            }
            let id = ObjectId::from_bytes(&content[id_start..id_end])?;

            entries.push(TreeEntry { mode, name, id });
            pos = id_end;
        }

        Ok(Self { entries })
    }

    /// Serialize back to the binary payload form, preserving entry order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    /// Entries in display order (directories first, then by name).
    pub fn display_sorted(&self) -> Vec<TreeEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(display_cmp);
        sorted
    }

    /// Lookup an entry by name.
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depth-first traversal.
    ///
    /// `load` resolves a subtree id to its `Tree`; `visit` receives the path
    /// prefix (empty or ending in `/`) and each entry. Directory entries are
    /// emitted before the walk descends into them.
    pub fn walk<E>(
        &self,
        load: &mut impl FnMut(&ObjectId) -> Result<Tree, E>,
        visit: &mut impl FnMut(&BStr, &TreeEntry),
    ) -> Result<(), E> {
        self.walk_inner(BString::from(""), load, visit)
    }

    fn walk_inner<E>(
        &self,
        prefix: BString,
        load: &mut impl FnMut(&ObjectId) -> Result<Tree, E>,
        visit: &mut impl FnMut(&BStr, &TreeEntry),
    ) -> Result<(), E> {
        for entry in &self.entries {
            visit(prefix.as_bstr(), entry);
            if entry.mode.is_tree() {
                let subtree = load(&entry.id)?;
                let mut sub_prefix = prefix.clone();
                sub_prefix.push_str(&entry.name);
                sub_prefix.push(b'/');
                subtree.walk_inner(sub_prefix, load, visit)?;
            }
        }
        Ok(())
    }
}
