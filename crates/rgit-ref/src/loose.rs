use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use rgit_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;
use crate::Reference;

/// Read a loose ref file.
///
/// The file contains either `ref: <target>` (symbolic) or a 40-char hex
/// id. A symlinked ref file is rejected rather than followed.
pub(crate) fn read_loose_ref(
    git_dir: &Path,
    name: &RefName,
) -> Result<Option<Reference>, RefError> {
    let path = loose_ref_path(git_dir, name);

    match fs::symlink_metadata(&path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            return Err(RefError::SymlinkRef(path));
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RefError::IoPath {
                path: path.clone(),
                source: e,
            })
        }
    }

    let contents = fs::read(&path).map_err(|e| RefError::IoPath {
        path: path.clone(),
        source: e,
    })?;
    let trimmed = contents.trim();

    if let Some(target_bytes) = trimmed.strip_prefix(b"ref: ") {
        let target_str = std::str::from_utf8(target_bytes.trim())
            .map_err(|_| RefError::Parse("invalid UTF-8 in symbolic ref target".into()))?;
        let target = RefName::new(target_str)?;
        Ok(Some(Reference::Symbolic {
            name: name.clone(),
            target,
        }))
    } else {
        // The file begins with a 40-char hex id; anything after it is
        // ignored.
        let id_bytes = trimmed.get(..40).unwrap_or(trimmed);
        let hex = std::str::from_utf8(id_bytes)
            .map_err(|_| RefError::Parse("invalid UTF-8 in ref file".into()))?;
        let target = ObjectId::from_hex(hex)?;
        Ok(Some(Reference::Direct {
            name: name.clone(),
            target,
        }))
    }
}

/// Enumerate loose refs under a prefix (e.g. `refs/heads/`).
///
/// Returns ref names sorted lexicographically. Filesystem artefacts like
/// `.DS_Store` and leftover `.lock` files are skipped.
pub(crate) fn enumerate_loose_refs(
    git_dir: &Path,
    prefix: &str,
) -> Result<Vec<RefName>, RefError> {
    let sub = prefix.strip_prefix("refs/").unwrap_or(prefix);
    let search_dir = if sub.is_empty() {
        git_dir.join("refs")
    } else {
        git_dir.join("refs").join(sub.trim_end_matches('/'))
    };

    let mut result = Vec::new();
    if search_dir.is_dir() {
        collect_refs_recursive(git_dir, &search_dir, prefix, &mut result)?;
    }
    result.sort();
    Ok(result)
}

fn collect_refs_recursive(
    git_dir: &Path,
    dir: &Path,
    prefix: &str,
    result: &mut Vec<RefName>,
) -> Result<(), RefError> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(RefError::IoPath {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|e| RefError::IoPath {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if file_name.contains(".DS_Store") {
            continue;
        }

        if path.is_dir() {
            collect_refs_recursive(git_dir, &path, prefix, result)?;
        } else if path.is_file() {
            if file_name.ends_with(".lock") {
                continue;
            }

            let rel_path = path
                .strip_prefix(git_dir)
                .map_err(|_| RefError::Parse("cannot determine ref name from path".into()))?;
            let Some(name_str) = rel_path.to_str() else {
                continue;
            };

            if let Ok(name) = RefName::new(name_str) {
                if name.as_str().starts_with(prefix) {
                    result.push(name);
                }
            }
        }
    }

    Ok(())
}

/// The filesystem path of a loose ref.
pub(crate) fn loose_ref_path(git_dir: &Path, name: &RefName) -> PathBuf {
    git_dir.join(name.as_str())
}
