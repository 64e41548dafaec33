//! Change detection between the live document and the last attempted save.
//!
//! Documents are compared structurally through a JSON fingerprint in which the
//! photo is replaced by a metadata proxy, so payload bytes are never touched.
//!
//! The proxy is `(name, size, last_modified)`. A file replaced by different
//! content with the same name, size and modification time is reported as
//! unchanged. Missing a real edit any other way is not possible.

use serde_json::{json, Value};

use crate::models::document::{Photo, ResumeValues};

/// Structural fingerprint of a document. The `id` is excluded since it is
/// assigned by the store, not edited.
pub fn fingerprint(values: &ResumeValues) -> Option<Value> {
    let mut value = serde_json::to_value(values).ok()?;
    let map = value.as_object_mut()?;
    map.remove("id");
    map.insert("photo".to_string(), photo_proxy(&values.photo));
    Some(value)
}

fn photo_proxy(photo: &Photo) -> Value {
    match photo {
        Photo::Unset => json!({ "state": "unset" }),
        Photo::Removed => json!({ "state": "removed" }),
        Photo::Remote(url) => json!({ "state": "remote", "url": url }),
        Photo::Pending(blob) => {
            let (name, size, last_modified) = blob.proxy();
            json!({
                "state": "pending",
                "name": name,
                "size": size,
                "lastModified": last_modified,
            })
        }
    }
}

/// True when `current` differs from `snapshot` in any field the user edits.
pub fn has_unsaved_changes(current: &ResumeValues, snapshot: &ResumeValues) -> bool {
    match (fingerprint(current), fingerprint(snapshot)) {
        (Some(current), Some(snapshot)) => current != snapshot,
        // Unfingerprintable state is never assumed saved.
        _ => true,
    }
}

/// Whether the photo needs no re-transmission relative to `previous`.
pub fn photo_unchanged(current: &Photo, previous: &Photo) -> bool {
    match (current, previous) {
        (Photo::Unset, Photo::Unset) => true,
        (Photo::Remote(a), Photo::Remote(b)) => a == b,
        (Photo::Pending(a), Photo::Pending(b)) => a.proxy() == b.proxy(),
        (Photo::Removed, Photo::Removed) => true,
        _ => false,
    }
}
