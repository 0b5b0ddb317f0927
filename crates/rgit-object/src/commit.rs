use bstr::{BStr, BString, ByteSlice};
use rgit_hash::ObjectId;
use rgit_utils::Signature;

use crate::ObjectError;

/// A parsed commit payload.
///
/// Very old or hand-made commits can lack author or committer headers;
/// those fields are optional so such objects still parse. A commit without
/// a `tree` header is corrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Id of the root tree.
    pub tree: ObjectId,
    /// Parent commit ids, in header order (empty for a root commit).
    pub parents: Vec<ObjectId>,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
    /// Everything after the blank line separating headers from the message.
    pub message: BString,
}

impl Commit {
    /// Parse commit content from raw payload bytes (no object header).
    ///
    /// Recognised headers, in order: `tree` (exactly once), `parent` (zero
    /// or more), `author`, `committer`. Unknown headers are skipped,
    /// including multi-line ones like `gpgsig` whose continuation lines
    /// are indented by a single space. A structurally malformed header
    /// block ends header parsing early; the commit is an error only when no
    /// tree header was found.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut tree: Option<ObjectId> = None;
        let mut parents = Vec::new();
        let mut author: Option<Signature> = None;
        let mut committer: Option<Signature> = None;

        let data = content;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }

            // Blank line separates headers from the message.
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

            let Some(space_pos) = line.iter().position(|&b| b == b' ') else {
                // Malformed header block; keep whatever headers were parsed
                // and treat the remainder as the message.
                break;
            };
            let key = &line[..space_pos];
            let value = &line[space_pos + 1..];

            match key {
                b"tree" => {
                    tree = Some(parse_oid_value(value, "tree")?);
                }
                b"parent" => {
                    parents.push(parse_oid_value(value, "parent")?);
                }
                b"author" => {
                    author = Some(parse_signature(value)?);
                }
                b"committer" => {
                    committer = Some(parse_signature(value)?);
                }
                _ => {
                    // Unknown header (gpgsig, mergetag, encoding, ...).
                    // Consume any continuation lines indented by one space.
                    let mut next = line_end + 1;
                    while next < data.len() && data[next] == b' ' {
                        let cont_end = data[next..]
                            .iter()
                            .position(|&b| b == b'\n')
                            .map(|p| p + next)
                            .unwrap_or(data.len());
                        next = cont_end + 1;
                    }
                    pos = next;
                    continue;
                }
            }

            pos = line_end + 1;
        }

        let tree = tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        let message = BString::from(&data[pos.min(data.len())..]);

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message,
        })
    }

    /// The first parent id (None for root commits).
    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// Whether this commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Whether this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// The committer timestamp in seconds since the epoch, 0 if absent.
    pub fn commit_time(&self) -> i64 {
        self.committer.as_ref().map(|s| s.date.timestamp).unwrap_or(0)
    }

    /// The first line of the message.
    pub fn summary(&self) -> &BStr {
        let msg: &[u8] = self.message.as_ref();
        match msg.find_byte(b'\n') {
            Some(p) => BStr::new(&msg[..p]),
            None => BStr::new(msg),
        }
    }
}

fn parse_oid_value(value: &[u8], field: &'static str) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| ObjectError::InvalidHeader(format!("non-UTF-8 {field} id")))?;
    Ok(ObjectId::from_hex(hex.trim_end())?)
}

fn parse_signature(value: &[u8]) -> Result<Signature, ObjectError> {
    Signature::parse(BStr::new(value))
        .map_err(|e| ObjectError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        out.extend_from_slice(b"parent 0000000000000000000000000000000000000001\n");
        out.extend_from_slice(b"author Test Author <author@example.com> 1112904793 +0200\n");
        out.extend_from_slice(
            b"committer Test Committer <committer@example.com> 1112904794 +0200\n",
        );
        out.extend_from_slice(b"\n");
        out.extend_from_slice(b"test commit\n");
        out
    }

    #[test]
    fn parse_commit() {
        let commit = Commit::parse(&sample_commit_bytes()).unwrap();
        assert_eq!(
            commit.tree.to_hex(),
            "095a057d4a651ec412d06b59e32e9b02871592d5"
        );
        assert_eq!(commit.parents.len(), 1);
        let author = commit.author.unwrap();
        assert_eq!(author.name, "Test Author");
        assert_eq!(author.email, "author@example.com");
        assert_eq!(author.date.timestamp, 1112904793);
        assert_eq!(author.date.tz_offset, 120);
        let committer = commit.committer.unwrap();
        assert_eq!(committer.date.timestamp, 1112904794);
        assert_eq!(commit.message, "test commit\n");
    }

    #[test]
    fn parse_root_commit() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nroot\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.is_root());
        assert!(!commit.is_merge());
        assert_eq!(commit.first_parent(), None);
    }

    #[test]
    fn parse_merge_commit_keeps_parent_order() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        data.extend_from_slice(b"parent 0000000000000000000000000000000000000002\n");
        data.extend_from_slice(b"parent 0000000000000000000000000000000000000001\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nMerge\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.is_merge());
        assert_eq!(
            commit.parents[0].to_hex(),
            "0000000000000000000000000000000000000002"
        );
        assert_eq!(
            commit.parents[1].to_hex(),
            "0000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn gpgsig_continuation_lines_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"gpgsig -----BEGIN PGP SIGNATURE-----\n");
        data.extend_from_slice(b" iQEcBAABAgAGBQJTx1rvAAoJEF\n");
        data.extend_from_slice(b" =fRLB\n");
        data.extend_from_slice(b" -----END PGP SIGNATURE-----\n");
        data.extend_from_slice(b"\nsigned commit\n");

        let commit = Commit::parse(&data).unwrap();
        assert_eq!(commit.message, "signed commit\n");
        assert!(commit.committer.is_some());
    }

    #[test]
    fn unknown_headers_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"encoding ISO-8859-1\n");
        data.extend_from_slice(b"\nmessage\n");

        let commit = Commit::parse(&data).unwrap();
        assert_eq!(commit.message, "message\n");
    }

    #[test]
    fn malformed_block_still_recovers_tree() {
        // No blank-line separator, garbage after the headers.
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        data.extend_from_slice(b"thisisnotaheaderline\n");

        let commit = Commit::parse(&data).unwrap();
        assert_eq!(
            commit.tree.to_hex(),
            "095a057d4a651ec412d06b59e32e9b02871592d5"
        );
        assert!(commit.author.is_none());
    }

    #[test]
    fn missing_tree_errors() {
        let data =
            b"author A <a@b.com> 1000000000 +0000\ncommitter A <a@b.com> 1000000000 +0000\n\nmsg\n";
        assert!(matches!(
            Commit::parse(data),
            Err(ObjectError::MissingCommitField { field: "tree" })
        ));
    }

    #[test]
    fn empty_message() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 095a057d4a651ec412d06b59e32e9b02871592d5\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.message.is_empty());
    }

    #[test]
    fn summary_line() {
        let commit = Commit::parse(&sample_commit_bytes()).unwrap();
        assert_eq!(commit.summary(), "test commit");
    }

    #[test]
    fn timestamps_compare_by_instant() {
        // 22:13:13 +0200 equals 20:13:13 +0000.
        let a = Signature::parse(BStr::new(b"A <a@b> 1112904793 +0200")).unwrap();
        let b = Signature::parse(BStr::new(b"A <a@b> 1112904793 +0000")).unwrap();
        assert_eq!(a.date, b.date);
    }
}
