use crate::{ObjectError, ObjectKind};

/// Parse a loose object header from raw bytes.
///
/// The header format is `"<type> <size>\0"`. Returns `(kind, payload_size,
/// header_length)` where `header_length` includes the null terminator.
pub fn parse_header(data: &[u8]) -> Result<(ObjectKind, u64, usize), ObjectError> {
    let null_pos = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ObjectError::InvalidHeader("missing null terminator".into()))?;

    let header = &data[..null_pos];
    let space_pos = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space in header".into()))?;

    let kind = ObjectKind::from_bytes(&header[..space_pos])?;

    let size_bytes = &header[space_pos + 1..];
    let size_str = std::str::from_utf8(size_bytes)
        .map_err(|_| ObjectError::InvalidHeader("non-ASCII size".into()))?;
    let size: u64 = size_str
        .parse()
        .map_err(|_| ObjectError::InvalidHeader(format!("invalid size: {size_str}")))?;

    Ok((kind, size, null_pos + 1))
}

/// Write a loose object header: `"<type> <size>\0"`.
pub fn write_header(kind: ObjectKind, size: u64) -> Vec<u8> {
    format!("{} {}\0", kind, size).into_bytes()
}
