//! Autosave state machine.
//!
//! The coordinator is synchronous: it decides when a save starts and what it
//! sends, and folds the gateway's answer back into its state. Awaiting the
//! gateway is the caller's job (see `editor::session`), which keeps edits
//! flowing while a save is in flight.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::autosave::change_detector::{has_unsaved_changes, photo_unchanged};
use crate::autosave::gateway::{GatewayError, SavePayload, SaveReceipt};
use crate::models::document::{Photo, ResumeValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Saving,
}

/// Consumer-facing view of the autosave state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveStatus {
    pub is_saving: bool,
    pub has_unsaved_changes: bool,
}

/// One save in flight: the exact state being sent, and the payload built from it.
#[derive(Debug, Clone)]
pub struct SaveAttempt {
    pub document: ResumeValues,
    pub payload: SavePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: Uuid, id_assigned: bool },
    Failed { message: String },
    /// The coordinator was deactivated before the response arrived.
    Ignored,
}

pub struct AutosaveCoordinator {
    state: SaveState,
    resume_id: Option<Uuid>,
    /// What was last sent (or loaded). Never shares data with `live`.
    snapshot: ResumeValues,
    live: ResumeValues,
    last_debounced: Option<ResumeValues>,
    /// Set on failure; suppresses automatic saves until new content or a retry.
    error_gate: bool,
    /// The most recent attempt that has not succeeded, kept for retry.
    last_attempt: Option<SaveAttempt>,
    /// Photo as of the last successful save (or load). Whether a save
    /// carries the photo is decided against this, never against a failed
    /// attempt.
    confirmed_photo: Photo,
    photo_url: Option<String>,
    active: bool,
}

impl AutosaveCoordinator {
    pub fn new(initial: ResumeValues) -> Self {
        Self {
            state: SaveState::Idle,
            resume_id: initial.id,
            confirmed_photo: initial.photo.clone(),
            snapshot: initial.clone(),
            live: initial,
            last_debounced: None,
            error_gate: false,
            last_attempt: None,
            photo_url: None,
            active: true,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn resume_id(&self) -> Option<Uuid> {
        self.resume_id
    }

    pub fn is_blocked(&self) -> bool {
        self.error_gate
    }

    /// URL of the stored photo as last reported by the gateway.
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    pub fn status(&self) -> AutosaveStatus {
        AutosaveStatus {
            is_saving: self.state == SaveState::Saving,
            has_unsaved_changes: has_unsaved_changes(&self.live, &self.snapshot),
        }
    }

    /// Records the latest, non-debounced editor state.
    pub fn record_edit(&mut self, values: ResumeValues) {
        self.live = values;
    }

    /// Handles a debounced document. Returns the attempt to send, if a save starts.
    pub fn on_debounced(&mut self, values: ResumeValues) -> Option<SaveAttempt> {
        let content_changed = self
            .last_debounced
            .as_ref()
            .map_or(true, |previous| has_unsaved_changes(&values, previous));
        if content_changed && self.error_gate {
            debug!("new content after a failed save; autosave unblocked");
            self.error_gate = false;
        }
        self.last_debounced = Some(values);
        self.poll()
    }

    /// Starts a save for the last debounced document when one is due.
    ///
    /// Called after each debounced value and again when a save completes, so
    /// content that settled during an in-flight save is not lost.
    pub fn poll(&mut self) -> Option<SaveAttempt> {
        if !self.active || self.state != SaveState::Idle || self.error_gate {
            return None;
        }
        let candidate = self.last_debounced.as_ref()?;
        if !has_unsaved_changes(candidate, &self.snapshot) {
            return None;
        }
        let document = candidate.clone();
        Some(self.begin(document))
    }

    /// User-initiated retry. Re-sends the failed attempt's payload as it
    /// was, photo included, addressed to the current id.
    pub fn retry(&mut self) -> Option<SaveAttempt> {
        self.error_gate = false;
        if !self.active || self.state != SaveState::Idle {
            return None;
        }
        match self.last_attempt.clone() {
            Some(mut attempt) => {
                attempt.payload.id = self.resume_id;
                info!(
                    photo_included = attempt.payload.photo.is_some(),
                    "retrying resume save"
                );
                self.state = SaveState::Saving;
                Some(attempt)
            }
            None => {
                let document = self.last_debounced.clone()?;
                info!("retrying resume save");
                Some(self.begin(document))
            }
        }
    }

    fn begin(&mut self, document: ResumeValues) -> SaveAttempt {
        let photo = if photo_unchanged(&document.photo, &self.confirmed_photo) {
            None
        } else {
            Some(document.photo.clone())
        };
        let payload = SavePayload {
            values: document.clone(),
            photo,
            id: self.resume_id,
        };
        debug!(
            resume_id = ?self.resume_id,
            photo_included = payload.photo.is_some(),
            "starting resume save"
        );
        self.state = SaveState::Saving;
        let attempt = SaveAttempt { document, payload };
        self.last_attempt = Some(attempt.clone());
        attempt
    }

    /// Applies the gateway's answer for `attempt`.
    pub fn complete(
        &mut self,
        attempt: SaveAttempt,
        result: Result<SaveReceipt, GatewayError>,
    ) -> SaveOutcome {
        if !self.active {
            debug!("discarding save response for a closed editor");
            return SaveOutcome::Ignored;
        }
        self.state = SaveState::Idle;
        if result.is_ok() {
            self.confirmed_photo = attempt.document.photo.clone();
            self.last_attempt = None;
        }
        // Success or not, the attempted state becomes the comparison base;
        // a failure is only re-sent on new content or an explicit retry.
        self.snapshot = attempt.document;

        match result {
            Ok(receipt) => {
                let id_assigned = self.resume_id.is_none();
                if id_assigned {
                    info!(resume_id = %receipt.id, "resume created");
                }
                self.resume_id = Some(receipt.id);
                if receipt.photo_url.is_some() {
                    self.photo_url = receipt.photo_url;
                }
                self.error_gate = false;
                SaveOutcome::Saved {
                    id: receipt.id,
                    id_assigned,
                }
            }
            Err(e) => {
                warn!("resume save failed: {e}");
                self.error_gate = true;
                SaveOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Marks the owning editor as torn down. Later responses are ignored.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::PhotoBlob;
    use bytes::Bytes;

    fn with_summary(summary: &str) -> ResumeValues {
        ResumeValues {
            summary: Some(summary.to_string()),
            ..Default::default()
        }
    }

    fn ok(id: Uuid) -> Result<SaveReceipt, GatewayError> {
        Ok(SaveReceipt { id, photo_url: None })
    }

    fn failure() -> Result<SaveReceipt, GatewayError> {
        Err(GatewayError::Transport("connection reset".into()))
    }

    #[test]
    fn test_unchanged_document_does_not_save() {
        let mut coordinator = AutosaveCoordinator::new(with_summary("Engineer"));
        assert!(coordinator.on_debounced(with_summary("Engineer")).is_none());
        assert!(!coordinator.status().has_unsaved_changes);
    }

    #[test]
    fn test_first_save_adopts_returned_id() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let attempt = coordinator.on_debounced(with_summary("Engineer")).unwrap();
        assert_eq!(attempt.payload.id, None);
        assert!(attempt.payload.photo.is_none());
        assert!(coordinator.status().is_saving);

        let id = Uuid::new_v4();
        let outcome = coordinator.complete(attempt, ok(id));
        assert_eq!(outcome, SaveOutcome::Saved { id, id_assigned: true });
        assert_eq!(coordinator.resume_id(), Some(id));

        let second = coordinator.on_debounced(with_summary("Staff Engineer")).unwrap();
        assert_eq!(second.payload.id, Some(id));
        let outcome = coordinator.complete(second, ok(id));
        assert_eq!(outcome, SaveOutcome::Saved { id, id_assigned: false });
    }

    #[test]
    fn test_no_second_save_while_saving() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let attempt = coordinator.on_debounced(with_summary("a")).unwrap();
        assert!(coordinator.on_debounced(with_summary("ab")).is_none());
        assert!(coordinator.retry().is_none());

        coordinator.complete(attempt, ok(Uuid::new_v4()));
        // Content that settled while saving is picked up afterwards.
        let next = coordinator.poll().unwrap();
        assert_eq!(next.document.summary.as_deref(), Some("ab"));
    }

    #[test]
    fn test_failure_snapshots_attempt_and_blocks() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let attempt = coordinator.on_debounced(with_summary("Engineer")).unwrap();
        let outcome = coordinator.complete(attempt, failure());
        assert!(matches!(outcome, SaveOutcome::Failed { .. }));
        assert!(coordinator.is_blocked());
        assert!(!coordinator.status().is_saving);

        // Same content again: nothing to send, no retry loop.
        coordinator.record_edit(with_summary("Engineer"));
        assert!(!coordinator.status().has_unsaved_changes);
        assert!(coordinator.on_debounced(with_summary("Engineer")).is_none());
        assert!(coordinator.poll().is_none());
    }

    #[test]
    fn test_new_content_clears_error_gate() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let attempt = coordinator.on_debounced(with_summary("Engineer")).unwrap();
        coordinator.complete(attempt, failure());

        let attempt = coordinator.on_debounced(with_summary("Engineer II")).unwrap();
        assert!(!coordinator.is_blocked());
        assert_eq!(attempt.document.summary.as_deref(), Some("Engineer II"));
    }

    #[test]
    fn test_retry_resends_failed_attempt() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let attempt = coordinator.on_debounced(with_summary("Engineer")).unwrap();
        coordinator.complete(attempt, failure());

        let retry = coordinator.retry().unwrap();
        assert!(!coordinator.is_blocked());
        assert_eq!(retry.document.summary.as_deref(), Some("Engineer"));
        assert_eq!(retry.payload.id, None);

        let id = Uuid::new_v4();
        coordinator.complete(retry, ok(id));
        assert_eq!(coordinator.resume_id(), Some(id));
    }

    fn with_pending_photo() -> ResumeValues {
        ResumeValues {
            photo: Photo::Pending(PhotoBlob::new("me.png", 5, Bytes::from_static(b"img"))),
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_resends_failed_photo() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let first = coordinator.on_debounced(with_pending_photo()).unwrap();
        assert!(matches!(first.payload.photo, Some(Photo::Pending(_))));
        coordinator.complete(first, failure());

        let retry = coordinator.retry().unwrap();
        assert!(matches!(retry.payload.photo, Some(Photo::Pending(_))));
        assert!(coordinator.status().is_saving);

        let id = Uuid::new_v4();
        coordinator.complete(
            retry,
            Ok(SaveReceipt {
                id,
                photo_url: Some("blob://abc".into()),
            }),
        );
        assert_eq!(coordinator.photo_url(), Some("blob://abc"));
        assert!(coordinator.retry().unwrap().payload.photo.is_none());
    }

    #[test]
    fn test_retry_targets_id_assigned_since_failure() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let first = coordinator.on_debounced(with_summary("a")).unwrap();
        coordinator.complete(first, failure());
        let second = coordinator.on_debounced(with_summary("ab")).unwrap();
        assert_eq!(second.payload.id, None);
        let id = Uuid::new_v4();
        coordinator.complete(second, ok(id));

        let next = coordinator.on_debounced(with_summary("abc")).unwrap();
        coordinator.complete(next, failure());
        let retry = coordinator.retry().unwrap();
        assert_eq!(retry.payload.id, Some(id));
        assert_eq!(retry.document.summary.as_deref(), Some("abc"));
    }

    #[test]
    fn test_edit_after_failed_photo_save_still_uploads_photo() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let first = coordinator.on_debounced(with_pending_photo()).unwrap();
        coordinator.complete(first, failure());

        let mut doc = with_pending_photo();
        doc.summary = Some("Engineer".into());
        let next = coordinator.on_debounced(doc).unwrap();
        assert!(matches!(next.payload.photo, Some(Photo::Pending(_))));
    }

    #[test]
    fn test_unchanged_photo_is_not_resent() {
        let photo = Photo::Pending(PhotoBlob::new("me.png", 5, Bytes::from_static(b"img")));
        let mut doc = ResumeValues {
            photo,
            ..Default::default()
        };
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());

        let first = coordinator.on_debounced(doc.clone()).unwrap();
        assert!(matches!(first.payload.photo, Some(Photo::Pending(_))));
        let id = Uuid::new_v4();
        coordinator.complete(
            first,
            Ok(SaveReceipt {
                id,
                photo_url: Some("blob://abc".into()),
            }),
        );
        assert_eq!(coordinator.photo_url(), Some("blob://abc"));

        doc.summary = Some("Engineer".into());
        let second = coordinator.on_debounced(doc).unwrap();
        assert!(second.payload.photo.is_none());
        assert_eq!(second.payload.id, Some(id));
    }

    #[test]
    fn test_removed_photo_is_sent() {
        let initial = ResumeValues {
            photo: Photo::Remote("blob://abc".into()),
            ..Default::default()
        };
        let mut coordinator = AutosaveCoordinator::new(initial.clone());
        let mut doc = initial;
        doc.photo = Photo::Removed;
        let attempt = coordinator.on_debounced(doc).unwrap();
        assert!(matches!(attempt.payload.photo, Some(Photo::Removed)));
    }

    #[test]
    fn test_response_after_deactivate_is_ignored() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        let attempt = coordinator.on_debounced(with_summary("Engineer")).unwrap();
        coordinator.deactivate();
        assert_eq!(coordinator.complete(attempt, ok(Uuid::new_v4())), SaveOutcome::Ignored);
        assert_eq!(coordinator.resume_id(), None);
        assert!(coordinator.on_debounced(with_summary("x")).is_none());
    }

    #[test]
    fn test_has_unsaved_changes_tracks_live_edits() {
        let mut coordinator = AutosaveCoordinator::new(ResumeValues::default());
        coordinator.record_edit(with_summary("E"));
        assert!(coordinator.status().has_unsaved_changes);
        let attempt = coordinator.on_debounced(with_summary("E")).unwrap();
        coordinator.complete(attempt, ok(Uuid::new_v4()));
        assert!(!coordinator.status().has_unsaved_changes);
    }
}
