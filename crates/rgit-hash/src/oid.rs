use std::fmt;
use std::str::FromStr;

use crate::hex::{hex_decode, hex_to_string};
use crate::HashError;

/// A git object identifier: the 20-byte SHA-1 of an object's framed content.
///
/// Ordering is lexicographic on the raw bytes, which agrees with the
/// ordering of the lowercase hex form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Length of the raw digest in bytes.
    pub const RAW_LEN: usize = 20;
    /// Length of the hex representation.
    pub const HEX_LEN: usize = 40;
    /// The null (all-zeros) id.
    pub const NULL: Self = Self([0u8; 20]);

    /// Create an ObjectId from exactly 20 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != Self::RAW_LEN {
            return Err(HashError::InvalidHashLength {
                expected: Self::RAW_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Create an ObjectId from a 40-character hex string (either case).
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        if hex.len() != Self::HEX_LEN {
            return Err(HashError::InvalidHexLength {
                expected: Self::HEX_LEN,
                actual: hex.len(),
            });
        }
        let mut bytes = [0u8; 20];
        hex_decode(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the null (all-zeros) id.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// The lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex_to_string(&self.0)
    }

    /// The first byte of the digest (for fan-out table indexing).
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// The loose object path component: `"xx/xxxx..."`.
    pub fn loose_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
