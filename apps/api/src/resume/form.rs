//! Multipart layout of a save request, shared by the handler and `HttpGateway`.
//!
//! - `resume`: JSON `ResumeValues`. Its `photo` field is ignored.
//! - `photo`: optional file part carrying a new photo.
//! - `photo_action`: optional text part, `remove` to clear the stored photo.
//!   Without `photo` or `photo_action` the stored photo is left as it is.

use crate::models::document::Photo;

pub const RESUME_PART: &str = "resume";
pub const PHOTO_PART: &str = "photo";
pub const PHOTO_ACTION_PART: &str = "photo_action";

pub const PHOTO_ACTION_REMOVE: &str = "remove";
pub const PHOTO_ACTION_KEEP: &str = "keep";

/// Upper bound on an uploaded photo.
pub const MAX_PHOTO_BYTES: usize = 4 * 1024 * 1024;

/// Interprets a `photo_action` value. `None` for unknown actions.
pub fn parse_photo_action(value: &str) -> Option<Option<Photo>> {
    match value.trim() {
        PHOTO_ACTION_REMOVE => Some(Some(Photo::Removed)),
        PHOTO_ACTION_KEEP => Some(None),
        _ => None,
    }
}
