use bstr::{BStr, BString};
use rgit_hash::ObjectId;
use rgit_utils::Signature;

use crate::{ObjectError, ObjectKind};

/// A parsed annotated-tag payload.
///
/// Lightweight tags are just a ref pointing at a non-tag object and never
/// reach this parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Id of the tagged object.
    pub target: ObjectId,
    /// Kind of the tagged object.
    pub target_kind: ObjectKind,
    /// Tag name.
    pub name: BString,
    /// Tagger identity (absent on some very old tags).
    pub tagger: Option<Signature>,
    /// Tag message.
    pub message: BString,
}

impl Tag {
    /// Parse tag content from raw payload bytes (no object header).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut target: Option<ObjectId> = None;
        let mut target_kind: Option<ObjectKind> = None;
        let mut name: Option<BString> = None;
        let mut tagger: Option<Signature> = None;

        let data = content;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }
            if data[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];

            if let Some(space_pos) = line.iter().position(|&b| b == b' ') {
                let key = &line[..space_pos];
                let value = &line[space_pos + 1..];

                match key {
                    b"object" => {
                        let hex = std::str::from_utf8(value).map_err(|_| {
                            ObjectError::InvalidHeader("non-UTF-8 target id".into())
                        })?;
                        target = Some(ObjectId::from_hex(hex.trim_end())?);
                    }
                    b"type" => {
                        target_kind = Some(ObjectKind::from_bytes(value)?);
                    }
                    b"tag" => {
                        name = Some(BString::from(value));
                    }
                    b"tagger" => {
                        tagger = Some(
                            Signature::parse(BStr::new(value))
                                .map_err(|e| ObjectError::InvalidSignature(e.to_string()))?,
                        );
                    }
                    _ => {}
                }
            }

            pos = line_end + 1;
        }

        let target = target.ok_or(ObjectError::MissingTagField { field: "object" })?;
        let target_kind = target_kind.ok_or(ObjectError::MissingTagField { field: "type" })?;
        let name = name.ok_or(ObjectError::MissingTagField { field: "tag" })?;
        let message = BString::from(&data[pos.min(data.len())..]);

        Ok(Self {
            target,
            target_kind,
            name,
            tagger,
            message,
        })
    }
}
