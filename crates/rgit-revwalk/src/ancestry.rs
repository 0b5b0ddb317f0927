//! Parent lookup and ancestor checks.

use std::collections::{HashSet, VecDeque};

use rgit_hash::ObjectId;
use rgit_object::Commit;
use rgit_repo::Repository;

use crate::WalkError;

/// The parent ids of a commit, in header order.
pub fn parents(repo: &Repository, id: &ObjectId) -> Result<Vec<ObjectId>, WalkError> {
    Ok(read_commit(repo, id)?.parents)
}

/// Whether `ancestor` is reachable from `descendant` along parent links.
///
/// Reflexive: a commit is its own ancestor. Breadth-first with a visited
/// set, so it terminates even on malformed history.
pub fn is_ancestor(
    repo: &Repository,
    ancestor: &ObjectId,
    descendant: &ObjectId,
) -> Result<bool, WalkError> {
    if ancestor == descendant {
        return Ok(true);
    }

    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(*descendant);
    visited.insert(*descendant);

    while let Some(current) = queue.pop_front() {
        if current == *ancestor {
            return Ok(true);
        }
        let commit = read_commit(repo, &current)?;
        for parent in &commit.parents {
            if visited.insert(*parent) {
                queue.push_back(*parent);
            }
        }
    }

    Ok(false)
}

/// The first-parent segment from `last` back to `before`: includes `last`,
/// excludes `before`. Empty when `last` has no parents.
///
/// Follows only first parents, so the segment is a simple chain; the walk
/// stops at `before`, at a root commit, or when history cycles back on
/// itself.
pub fn commits_between(
    repo: &Repository,
    last: &ObjectId,
    before: &ObjectId,
) -> Result<Vec<ObjectId>, WalkError> {
    let mut result = Vec::new();

    let first = read_commit(repo, last)?;
    if first.is_root() {
        return Ok(result);
    }

    let mut visited = HashSet::new();
    let mut current = *last;
    let mut commit = first;
    loop {
        if current == *before || !visited.insert(current) {
            break;
        }
        result.push(current);
        match commit.first_parent() {
            Some(parent) => {
                current = *parent;
                commit = read_commit(repo, &current)?;
            }
            None => break,
        }
    }

    Ok(result)
}

pub(crate) fn read_commit(repo: &Repository, id: &ObjectId) -> Result<Commit, WalkError> {
    let obj = match repo.odb().read_cached(id) {
        Ok(obj) => obj,
        Err(rgit_odb::OdbError::NotFound(id)) => return Err(WalkError::CommitNotFound(id)),
        Err(e) => return Err(e.into()),
    };
    if obj.kind != rgit_object::ObjectKind::Commit {
        return Err(WalkError::NotACommit(*id));
    }
    let data = obj.data.ok_or(WalkError::CommitNotFound(*id))?;
    Ok(Commit::parse(&data)?)
}
