//! The `packed-refs` file.
//!
//! Format:
//!
//! ```text
//! # pack-refs with: peeled fully-peeled sorted
//! <hex-id> <refname>
//! ^<hex-id>   (peeled target of the annotated tag above)
//! ```

use std::fs;
use std::path::Path;

use bstr::ByteSlice;
use rgit_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;

/// A single entry parsed from packed-refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRef {
    pub name: RefName,
    pub id: ObjectId,
    /// Peeled target from a following `^` line (annotated tags only).
    pub peeled: Option<ObjectId>,
}

/// Parsed packed-refs file.
#[derive(Debug, Clone)]
pub struct PackedRefs {
    refs: Vec<PackedRef>,
    sorted: bool,
}

impl PackedRefs {
    /// Parse packed-refs contents.
    pub fn parse(data: &[u8]) -> Result<Self, RefError> {
        let mut refs: Vec<PackedRef> = Vec::new();
        let mut sorted = false;

        for line in data.lines() {
            if line.is_empty() {
                continue;
            }

            if line.starts_with(b"#") {
                if line.find(b"sorted").is_some() {
                    sorted = true;
                }
                continue;
            }

            // Peeled line attaches to the preceding ref.
            if let Some(peeled_bytes) = line.strip_prefix(b"^") {
                let hex = std::str::from_utf8(peeled_bytes)
                    .map_err(|_| RefError::Parse("invalid UTF-8 in peeled id".into()))?;
                let peeled = ObjectId::from_hex(hex.trim())?;
                if let Some(last) = refs.last_mut() {
                    last.peeled = Some(peeled);
                }
                continue;
            }

            let space_pos = line
                .find_byte(b' ')
                .ok_or_else(|| RefError::Parse("invalid packed-refs line".into()))?;

            let hex = std::str::from_utf8(&line[..space_pos])
                .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs id".into()))?;
            let id = ObjectId::from_hex(hex)?;

            let name_str = std::str::from_utf8(&line[space_pos + 1..])
                .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs name".into()))?;
            let name = RefName::new(name_str.trim())?;

            refs.push(PackedRef {
                name,
                id,
                peeled: None,
            });
        }

        Ok(Self { refs, sorted })
    }

    /// Load packed-refs from the git dir. A missing file is an empty set,
    /// not an error.
    pub fn load(git_dir: &Path) -> Result<Self, RefError> {
        let path = git_dir.join("packed-refs");
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    refs: Vec::new(),
                    sorted: true,
                })
            }
            Err(e) => {
                return Err(RefError::IoPath {
                    path: path.clone(),
                    source: e,
                })
            }
        };
        Self::parse(&data)
    }

    /// Find a ref by exact name.
    pub fn find(&self, name: &RefName) -> Option<&PackedRef> {
        if self.sorted {
            self.refs
                .binary_search_by(|pr| pr.name.cmp(name))
                .ok()
                .map(|idx| &self.refs[idx])
        } else {
            self.refs.iter().find(|pr| pr.name == *name)
        }
    }

    /// All parsed refs, in file order.
    pub fn refs(&self) -> &[PackedRef] {
        &self.refs
    }

    /// Whether the file declared itself sorted.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Whether there are no packed refs.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
