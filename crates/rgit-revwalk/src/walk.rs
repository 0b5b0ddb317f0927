//! History listing in committer-timestamp order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use rgit_hash::ObjectId;
use rgit_repo::Repository;

use crate::ancestry::read_commit;
use crate::WalkError;

/// An entry in the walk priority queue.
///
/// Ordered by committer timestamp descending; ties break on ascending
/// ObjectId so identical inputs always produce identical output order.
struct WalkEntry {
    id: ObjectId,
    commit_time: i64,
}

impl PartialEq for WalkEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WalkEntry {}

impl PartialOrd for WalkEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WalkEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: newest commit time wins; on equal times the smaller
        // id is emitted first.
        self.commit_time
            .cmp(&other.commit_time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Iterator over the ancestors of a commit, the commit itself included,
/// newest committer timestamp first.
pub struct AncestorIter<'a> {
    repo: &'a Repository,
    queue: BinaryHeap<WalkEntry>,
    seen: HashSet<ObjectId>,
    remaining: Option<usize>,
}

impl<'a> AncestorIter<'a> {
    /// Start a walk at `id` with an optional output limit.
    pub fn new(
        repo: &'a Repository,
        id: &ObjectId,
        limit: Option<usize>,
    ) -> Result<Self, WalkError> {
        let mut iter = Self {
            repo,
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
            remaining: limit,
        };
        iter.enqueue(*id)?;
        Ok(iter)
    }

    fn enqueue(&mut self, id: ObjectId) -> Result<(), WalkError> {
        if !self.seen.insert(id) {
            return Ok(());
        }
        let commit = read_commit(self.repo, &id)?;
        self.queue.push(WalkEntry {
            id,
            commit_time: commit.commit_time(),
        });
        Ok(())
    }

    fn next_inner(&mut self) -> Result<Option<ObjectId>, WalkError> {
        if let Some(0) = self.remaining {
            return Ok(None);
        }

        let Some(entry) = self.queue.pop() else {
            return Ok(None);
        };

        let commit = read_commit(self.repo, &entry.id)?;
        for parent in &commit.parents {
            self.enqueue(*parent)?;
        }

        if let Some(ref mut remaining) = self.remaining {
            *remaining -= 1;
        }
        Ok(Some(entry.id))
    }
}

impl Iterator for AncestorIter<'_> {
    type Item = Result<ObjectId, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_inner().transpose()
    }
}

/// The ancestors of `id` (inclusive), newest committer timestamp first,
/// truncated to `limit` when given.
pub fn commits_before(
    repo: &Repository,
    id: &ObjectId,
    limit: Option<usize>,
) -> Result<Vec<ObjectId>, WalkError> {
    AncestorIter::new(repo, id, limit)?.collect()
}
