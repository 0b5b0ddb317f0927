use sha1::{Digest, Sha1};

use crate::ObjectId;

/// Streaming SHA-1 computation.
///
/// Data is fed incrementally with [`update`](Hasher::update) or through the
/// [`std::io::Write`] implementation, then finalised into an [`ObjectId`].
pub struct Hasher {
    inner: Sha1,
}

impl Hasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the ObjectId.
    pub fn finalize(self) -> ObjectId {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        ObjectId::from_bytes(&bytes).expect("digest is 20 bytes")
    }

    /// Convenience: hash data in one call.
    pub fn digest(data: &[u8]) -> ObjectId {
        let mut h = Self::new();
        h.update(data);
        h.finalize()
    }

    /// Hash a git object in its canonical framing: `"{type} {len}\0{content}"`.
    pub fn hash_object(obj_type: &str, data: &[u8]) -> ObjectId {
        let header = format!("{} {}\0", obj_type, data.len());
        let mut h = Self::new();
        h.update(header.as_bytes());
        h.update(data);
        h.finalize()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
