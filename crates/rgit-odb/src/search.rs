//! Two-tier object search.
//!
//! Order: loose first, then each pack sorted by index path. A pack that
//! simply does not hold the id is skipped; any other failure aborts the
//! search. Ref-delta bases missing from a pack are looked up in the loose
//! store and the remaining packs.

use rgit_hash::ObjectId;
use rgit_object::RawObject;

use crate::{ObjectStore, OdbError};

pub(crate) fn find_object(
    store: &ObjectStore,
    id: &ObjectId,
    meta_only: bool,
) -> Result<Option<RawObject>, OdbError> {
    // Loose tier.
    if meta_only {
        if let Some((kind, size)) = store.loose.read_header(id)? {
            return Ok(Some(RawObject::meta(kind, size)));
        }
    } else if let Some(obj) = store.loose.read(id)? {
        return Ok(Some(obj));
    }

    // Pack tier.
    for pack in &store.packs {
        let resolver = |base_id: &ObjectId| -> Option<RawObject> {
            if let Ok(Some(obj)) = store.loose.read(base_id) {
                return Some(obj);
            }
            for other in &store.packs {
                if std::ptr::eq(other, pack) {
                    continue;
                }
                if let Ok(Some(obj)) = other.read(base_id, false) {
                    return Some(obj);
                }
            }
            None
        };

        if let Some(obj) = pack.read_with_resolver(id, meta_only, resolver)? {
            return Ok(Some(obj));
        }
    }

    Ok(None)
}
