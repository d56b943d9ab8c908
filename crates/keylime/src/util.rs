//! Object helpers shared by models and their callers.

use crate::value::ObjectRef;

/// Copy own properties from each source onto `target`, left to right.
///
/// Later sources win on key collisions; sources are left untouched. Returns
/// the target handle for chaining.
pub fn extend(target: &ObjectRef, sources: &[&ObjectRef]) -> ObjectRef {
    for source in sources {
        if source.ptr_eq(target) {
            continue;
        }
        for (key, value) in source.entries() {
            target.set(&key, value);
        }
    }
    target.clone()
}
