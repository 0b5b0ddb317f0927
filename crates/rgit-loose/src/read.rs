use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use rgit_hash::{Hasher, ObjectId};
use rgit_object::{header, ObjectKind, RawObject};

use crate::{LooseError, LooseStore};

impl LooseStore {
    /// Check if a loose object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// Read a loose object by id.
    ///
    /// Returns `Ok(None)` if the object file does not exist. A malformed
    /// header or a payload that does not match the declared size is
    /// `Corrupt`.
    pub fn read(&self, id: &ObjectId) -> Result<Option<RawObject>, LooseError> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let inflated = inflate_all(&compressed, id)?;
        let (kind, size, header_len) = header::parse_header(&inflated)?;

        let payload = &inflated[header_len..];
        if payload.len() as u64 != size {
            return Err(LooseError::Corrupt {
                id: id.to_hex(),
                reason: format!(
                    "payload length {} does not match declared size {size}",
                    payload.len()
                ),
            });
        }

        Ok(Some(RawObject::new(kind, payload.to_vec())))
    }

    /// Read just the header (kind + size) without inflating the payload.
    ///
    /// Returns `Ok(None)` if the object file does not exist.
    pub fn read_header(&self, id: &ObjectId) -> Result<Option<(ObjectKind, u64)>, LooseError> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        // Inflate only enough to see the header null terminator. Headers
        // are short; 64 bytes is plenty.
        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut buf = [0u8; 64];
        let mut filled = 0;

        loop {
            if filled >= buf.len() {
                return Err(LooseError::Corrupt {
                    id: id.to_hex(),
                    reason: "header exceeds 64 bytes".into(),
                });
            }
            let n = decoder
                .read(&mut buf[filled..])
                .map_err(|e| LooseError::Decompress {
                    id: id.to_hex(),
                    source: e,
                })?;
            if n == 0 {
                return Err(LooseError::Corrupt {
                    id: id.to_hex(),
                    reason: "unexpected EOF before header null terminator".into(),
                });
            }
            filled += n;
            if buf[..filled].contains(&0) {
                break;
            }
        }

        let (kind, size, _header_len) = header::parse_header(&buf[..filled])?;
        Ok(Some((kind, size)))
    }

    /// Read a loose object and verify the recomputed hash of its framed
    /// form equals the requested id.
    ///
    /// Returns `Ok(None)` if the object file does not exist.
    pub fn read_verified(&self, id: &ObjectId) -> Result<Option<RawObject>, LooseError> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let inflated = inflate_all(&compressed, id)?;
        let actual = Hasher::digest(&inflated);
        if actual != *id {
            return Err(LooseError::HashMismatch {
                path,
                expected: id.to_hex(),
                actual: actual.to_hex(),
            });
        }

        let (kind, size, header_len) = header::parse_header(&inflated)?;
        let payload = &inflated[header_len..];
        if payload.len() as u64 != size {
            return Err(LooseError::Corrupt {
                id: id.to_hex(),
                reason: format!(
                    "payload length {} does not match declared size {size}",
                    payload.len()
                ),
            });
        }

        Ok(Some(RawObject::new(kind, payload.to_vec())))
    }
}

/// Zlib-inflate the full contents of a loose object file.
fn inflate_all(compressed: &[u8], id: &ObjectId) -> Result<Vec<u8>, LooseError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| LooseError::Decompress {
            id: id.to_hex(),
            source: e,
        })?;
    Ok(inflated)
}
