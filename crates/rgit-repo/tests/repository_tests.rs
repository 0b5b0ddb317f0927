//! End-to-end repository reads over a synthetic on-disk repository.

use std::io::Write;
use std::path::Path;

use bstr::ByteSlice;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rgit_hash::{Hasher, ObjectId};
use rgit_object::{header, EntryMode, ObjectKind};
use rgit_repo::{Head, RepoError, Repository};

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Write a loose object under `<git_dir>/objects` and return its id.
fn write_loose(git_dir: &Path, kind: ObjectKind, payload: &[u8]) -> ObjectId {
    let mut framed = header::write_header(kind, payload.len() as u64);
    framed.extend_from_slice(payload);
    let id = Hasher::digest(&framed);

    let path = git_dir.join("objects").join(id.loose_path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, deflate(&framed)).unwrap();
    id
}

/// Write `objects/pack/<name>.{pack,idx}` holding plain objects.
fn write_pack(git_dir: &Path, name: &str, objects: &[(ObjectKind, &[u8])]) -> Vec<ObjectId> {
    use rgit_pack::entry::encode_entry_header;
    use rgit_pack::{IDX_SIGNATURE, IDX_VERSION, PACK_SIGNATURE, PACK_VERSION};

    let pack_dir = git_dir.join("objects/pack");
    std::fs::create_dir_all(&pack_dir).unwrap();

    let mut pack_data = Vec::new();
    pack_data.extend_from_slice(PACK_SIGNATURE);
    pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
    pack_data.extend_from_slice(&(objects.len() as u32).to_be_bytes());

    let mut entries = Vec::new();
    for (kind, payload) in objects {
        let offset = pack_data.len() as u64;
        let type_num = match kind {
            ObjectKind::Commit => 1,
            ObjectKind::Tree => 2,
            ObjectKind::Blob => 3,
            ObjectKind::Tag => 4,
        };
        pack_data.extend_from_slice(&encode_entry_header(type_num, payload.len() as u64));
        pack_data.extend_from_slice(&deflate(payload));
        entries.push((Hasher::hash_object(kind.as_str(), payload), offset));
    }

    let pack_checksum = Hasher::digest(&pack_data);
    pack_data.extend_from_slice(pack_checksum.as_bytes());
    std::fs::write(pack_dir.join(format!("{name}.pack")), &pack_data).unwrap();

    // Companion v2 index.
    let mut sorted = entries.clone();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut idx = Vec::new();
    idx.extend_from_slice(&IDX_SIGNATURE);
    idx.extend_from_slice(&IDX_VERSION.to_be_bytes());
    let mut fanout = [0u32; 256];
    for (id, _) in &sorted {
        fanout[id.first_byte() as usize] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    for count in fanout {
        idx.extend_from_slice(&count.to_be_bytes());
    }
    for (id, _) in &sorted {
        idx.extend_from_slice(id.as_bytes());
    }
    for _ in &sorted {
        idx.extend_from_slice(&0u32.to_be_bytes());
    }
    for (_, offset) in &sorted {
        idx.extend_from_slice(&(*offset as u32).to_be_bytes());
    }
    idx.extend_from_slice(pack_checksum.as_bytes());
    let idx_checksum = Hasher::digest(&idx);
    idx.extend_from_slice(idx_checksum.as_bytes());
    std::fs::write(pack_dir.join(format!("{name}.idx")), &idx).unwrap();

    entries.into_iter().map(|(id, _)| id).collect()
}

fn write_ref(git_dir: &Path, name: &str, contents: &str) {
    let path = git_dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
}

fn tree_payload(entries: &[(EntryMode, &str, ObjectId)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (mode, name, id) in entries {
        out.extend_from_slice(mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(id.as_bytes());
    }
    out
}

fn commit_payload(
    tree: &ObjectId,
    parents: &[ObjectId],
    author_time: i64,
    committer_time: i64,
    message: &str,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("tree {}\n", tree.to_hex()).as_bytes());
    for parent in parents {
        out.extend_from_slice(format!("parent {}\n", parent.to_hex()).as_bytes());
    }
    out.extend_from_slice(
        format!("author Test Author <author@example.com> {author_time} +0200\n").as_bytes(),
    );
    out.extend_from_slice(
        format!("committer Test Committer <committer@example.com> {committer_time} +0200\n")
            .as_bytes(),
    );
    out.push(b'\n');
    out.extend_from_slice(message.as_bytes());
    out
}

/// A repository holding a packed blob, a loose blob, a tree, a commit, and
/// a master branch: the smallest interesting repository.
struct TestRepo {
    dir: tempfile::TempDir,
    packed_blob: ObjectId,
    loose_blob: ObjectId,
    tree: ObjectId,
    commit: ObjectId,
}

impl TestRepo {
    fn build() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();

        let packed_ids = write_pack(git_dir, "pack-1", &[(ObjectKind::Blob, b"test")]);
        let packed_blob = packed_ids[0];

        let loose_blob = write_loose(git_dir, ObjectKind::Blob, b"test unpacked");

        let tree_data = tree_payload(&[(EntryMode::Regular, "test.txt", packed_blob)]);
        let tree = write_loose(git_dir, ObjectKind::Tree, &tree_data);

        let commit_data =
            commit_payload(&tree, &[], 1112904793, 1112904794, "test commit\n");
        let commit = write_loose(git_dir, ObjectKind::Commit, &commit_data);

        write_ref(git_dir, "refs/heads/master", &format!("{}\n", commit.to_hex()));
        write_ref(git_dir, "HEAD", "ref: refs/heads/master\n");

        Self {
            dir,
            packed_blob,
            loose_blob,
            tree,
            commit,
        }
    }

    fn open(&self) -> Repository {
        Repository::open(self.dir.path()).unwrap()
    }
}

#[test]
fn open_rejects_non_repository() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Repository::open(dir.path()),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn get_packed_blob() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    let obj = repo.get_object(&fixture.packed_blob, false).unwrap();
    assert_eq!(obj.kind, ObjectKind::Blob);
    assert_eq!(obj.size, 4);
    assert_eq!(obj.bytes(), Some(b"test".as_slice()));
}

#[test]
fn get_loose_blob() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    let obj = repo.get_object(&fixture.loose_blob, false).unwrap();
    assert_eq!(obj.kind, ObjectKind::Blob);
    assert_eq!(obj.size, 13);
    assert_eq!(obj.bytes(), Some(b"test unpacked".as_slice()));
}

#[test]
fn get_object_meta_only() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    let obj = repo.get_object(&fixture.packed_blob, true).unwrap();
    assert_eq!(obj.kind, ObjectKind::Blob);
    assert_eq!(obj.size, 4);
    assert!(obj.bytes().is_none());
}

#[test]
fn read_tree_entries() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    let tree = repo.read_tree(&fixture.tree).unwrap();
    assert_eq!(tree.len(), 1);
    let entry = &tree.entries[0];
    assert_eq!(entry.mode, EntryMode::Regular);
    assert_eq!(entry.name, "test.txt");
    assert_eq!(entry.id, fixture.packed_blob);

    // The entry's blob is readable and has the expected size.
    let blob = repo.get_object(&entry.id, true).unwrap();
    assert_eq!(blob.size, 4);
}

#[test]
fn read_commit_fields() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    let commit = repo.read_commit(&fixture.commit).unwrap();
    assert_eq!(commit.tree, fixture.tree);
    assert!(commit.parents.is_empty());
    assert_eq!(commit.message, "test commit\n");

    let author = commit.author.unwrap();
    assert_eq!(author.name, "Test Author");
    assert_eq!(author.email, "author@example.com");
    assert_eq!(author.date.timestamp, 1112904793);
    assert_eq!(author.date.tz_offset, 120);

    let committer = commit.committer.unwrap();
    assert_eq!(committer.name, "Test Committer");
    assert_eq!(committer.email, "committer@example.com");
    assert_eq!(committer.date.timestamp, 1112904794);
}

#[test]
fn read_blob_checks_kind() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    assert_eq!(repo.read_blob(&fixture.packed_blob).unwrap(), b"test");
    assert!(matches!(
        repo.read_blob(&fixture.commit),
        Err(RepoError::WrongKind { .. })
    ));
}

#[test]
fn missing_object_is_not_found() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    let missing = ObjectId::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
    assert!(matches!(
        repo.get_object(&missing, false),
        Err(RepoError::Odb(rgit_odb::OdbError::NotFound(id))) if id == missing
    ));
}

#[test]
fn resolve_branch_ref() {
    let fixture = TestRepo::build();
    let repo = fixture.open();

    assert_eq!(repo.resolve_ref("refs/heads/master").unwrap(), fixture.commit);
    assert_eq!(repo.resolve_ref("HEAD").unwrap(), fixture.commit);
}

#[test]
fn resolve_packed_ref_exact_name_only() {
    let fixture = TestRepo::build();
    std::fs::write(
        fixture.dir.path().join("packed-refs"),
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa refs/tags/master-123\n",
    )
    .unwrap();
    let repo = fixture.open();

    assert!(matches!(
        repo.resolve_ref("refs/tags/master"),
        Err(RepoError::Ref(rgit_ref::RefError::NotFound(name))) if name == "refs/tags/master"
    ));

    std::fs::write(
        fixture.dir.path().join("packed-refs"),
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa refs/tags/master\n",
    )
    .unwrap();
    let repo = fixture.open();
    assert_eq!(
        repo.resolve_ref("refs/tags/master").unwrap(),
        ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
    );
}

#[test]
fn head_on_branch() {
    let fixture = TestRepo::build();
    let repo = fixture.open();
    assert_eq!(repo.head().unwrap(), Head::Branch("master".into()));
    assert_eq!(repo.head_id().unwrap(), Some(fixture.commit));
}

#[test]
fn head_detached() {
    let fixture = TestRepo::build();
    write_ref(
        fixture.dir.path(),
        "HEAD",
        &format!("{}\n", fixture.commit.to_hex()),
    );
    let repo = fixture.open();
    assert_eq!(repo.head().unwrap(), Head::Detached(fixture.commit));
}

#[test]
fn list_branches_and_tags() {
    let fixture = TestRepo::build();
    let git_dir = fixture.dir.path();
    write_ref(
        git_dir,
        "refs/heads/feature/nested",
        &format!("{}\n", fixture.commit.to_hex()),
    );
    write_ref(
        git_dir,
        "refs/tags/v1.0",
        &format!("{}\n", fixture.commit.to_hex()),
    );
    // A packed-only tag merges in; the loose v1.0 shadows its packed twin.
    std::fs::write(
        git_dir.join("packed-refs"),
        format!(
            "{} refs/tags/v1.0\n{} refs/tags/v0.9\n",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", fixture.commit.to_hex()
        ),
    )
    .unwrap();

    let repo = fixture.open();
    assert_eq!(repo.list_branches().unwrap(), ["feature/nested", "master"]);
    assert_eq!(repo.list_tags().unwrap(), ["v0.9", "v1.0"]);

    assert!(repo.is_branch("master").unwrap());
    assert!(!repo.is_branch("missing").unwrap());
    assert!(repo.is_tag("v0.9").unwrap());
    assert!(repo.is_tag("v1.0").unwrap());
}

#[test]
fn peel_annotated_tag_to_commit() {
    let fixture = TestRepo::build();
    let git_dir = fixture.dir.path();

    let mut tag_data = Vec::new();
    tag_data.extend_from_slice(format!("object {}\n", fixture.commit.to_hex()).as_bytes());
    tag_data.extend_from_slice(b"type commit\n");
    tag_data.extend_from_slice(b"tag v1.0\n");
    tag_data.extend_from_slice(b"tagger Test Tagger <tagger@example.com> 1112904800 +0200\n");
    tag_data.extend_from_slice(b"\nrelease\n");
    let tag_id = write_loose(git_dir, ObjectKind::Tag, &tag_data);

    let repo = fixture.open();
    let tag = repo.read_tag(&tag_id).unwrap();
    assert_eq!(tag.target, fixture.commit);
    assert_eq!(tag.name, "v1.0");

    let commit = repo.peel_to_commit(&tag_id).unwrap();
    assert_eq!(commit.message, "test commit\n");
}

#[test]
fn blob_stream_for_loose_blob() {
    use std::io::Read;

    let fixture = TestRepo::build();
    let repo = fixture.open();

    let mut stream = repo.blob_stream(&fixture.loose_blob).unwrap().unwrap();
    assert_eq!(stream.size(), 13);
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"test unpacked");

    // Packed blobs have no loose stream.
    assert!(repo.blob_stream(&fixture.packed_blob).unwrap().is_none());
}

#[test]
fn walk_nested_tree() {
    let fixture = TestRepo::build();
    let git_dir = fixture.dir.path();

    let inner_blob = write_loose(git_dir, ObjectKind::Blob, b"inner");
    let subtree = write_loose(
        git_dir,
        ObjectKind::Tree,
        &tree_payload(&[(EntryMode::Regular, "inner.txt", inner_blob)]),
    );
    let root = write_loose(
        git_dir,
        ObjectKind::Tree,
        &tree_payload(&[
            (EntryMode::Regular, "a.txt", fixture.packed_blob),
            (EntryMode::Tree, "sub", subtree),
        ]),
    );

    let repo = fixture.open();
    let mut paths = Vec::new();
    repo.walk_tree(&root, &mut |prefix, entry| {
        paths.push(format!("{}{}", prefix, entry.name.as_bstr()));
    })
    .unwrap();

    assert_eq!(paths, ["a.txt", "sub", "sub/inner.txt"]);
}
