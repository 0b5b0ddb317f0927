use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use rgit_hash::ObjectId;
use rgit_object::{header, ObjectKind};

use crate::{LooseError, LooseStore};

/// Streaming reader for a loose object's payload.
///
/// Decompresses on demand as [`Read`] is called; never yields more than the
/// declared payload size. The underlying file handle is owned by the
/// decoder and released when the stream is dropped, on every exit path.
pub struct LooseStream {
    kind: ObjectKind,
    size: u64,
    decoder: ZlibDecoder<fs::File>,
    bytes_read: u64,
}

impl LooseStream {
    /// The object kind.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The declared payload size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// How many payload bytes remain to be read.
    pub fn bytes_remaining(&self) -> u64 {
        self.size.saturating_sub(self.bytes_read)
    }
}

impl Read for LooseStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.bytes_remaining();
        if remaining == 0 {
            return Ok(0);
        }
        let max_read = (remaining as usize).min(buf.len());
        let n = self.decoder.read(&mut buf[..max_read])?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl LooseStore {
    /// Open a streaming reader for a loose object.
    ///
    /// Returns `Ok(None)` if the object does not exist. The header is
    /// parsed eagerly; payload bytes are inflated on demand.
    pub fn stream(&self, id: &ObjectId) -> Result<Option<LooseStream>, LooseError> {
        let path = self.object_path(id);
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        // First pass: inflate just the header to learn kind, size, and
        // header length.
        let mut decoder = ZlibDecoder::new(file);
        let mut hdr_buf = [0u8; 64];
        let mut filled = 0;

        loop {
            if filled >= hdr_buf.len() {
                return Err(LooseError::Corrupt {
                    id: id.to_hex(),
                    reason: "header exceeds 64 bytes".into(),
                });
            }
            let n = decoder
                .read(&mut hdr_buf[filled..])
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
            if hdr_buf[..filled].contains(&0) {
                break;
            }
        }

        let (kind, size, header_len) = header::parse_header(&hdr_buf[..filled])?;

        // Re-open and position a fresh decoder just past the header so
        // reads yield only payload bytes.
        let file2 = fs::File::open(&path)?;
        let mut decoder2 = ZlibDecoder::new(file2);
        let mut skip_buf = vec![0u8; header_len];
        decoder2
            .read_exact(&mut skip_buf)
            .map_err(|e| LooseError::Decompress {
                id: id.to_hex(),
                source: e,
            })?;

        Ok(Some(LooseStream {
            kind,
            size,
            decoder: decoder2,
            bytes_read: 0,
        }))
    }
}
