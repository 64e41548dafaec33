//! A running editor: one task owning the autosave coordinator.
//!
//! All state changes happen on the session task, one event at a time: edits,
//! debounced values, save completions and user commands. Gateway calls run
//! on their own task so edits keep arriving while a save is in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::autosave::{
    AutosaveCoordinator, AutosaveStatus, Debouncer, GatewayError, PersistenceGateway, SaveAttempt,
    SaveOutcome, SaveReceipt, DEFAULT_DEBOUNCE,
};
use crate::editor::location::{EditorLocation, EditorStep};
use crate::models::document::ResumeValues;

const SAVE_FAILED_MESSAGE: &str = "Unable to save changes";
const TOAST_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastAction {
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub action: Option<ToastAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastEvent {
    Show(Toast),
    Dismiss(u64),
}

enum Command {
    Edit(ResumeValues),
    SetStep(EditorStep),
    Retry,
    Dismiss(u64),
    Status(oneshot::Sender<AutosaveStatus>),
    Location(oneshot::Sender<EditorLocation>),
    Close,
}

/// Cheap, cloneable handle to a running editor session.
///
/// Methods never block. Once the session has closed, commands are dropped
/// and queries return `None`.
#[derive(Clone)]
pub struct EditorHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<AutosaveStatus>,
    toasts: broadcast::Sender<ToastEvent>,
}

impl EditorHandle {
    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("editor session closed; command dropped");
        }
    }

    pub fn edit(&self, values: ResumeValues) {
        self.send(Command::Edit(values));
    }

    pub fn set_step(&self, step: EditorStep) {
        self.send(Command::SetStep(step));
    }

    /// The Retry action on a failure toast.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    pub fn dismiss(&self, toast_id: u64) {
        self.send(Command::Dismiss(toast_id));
    }

    pub fn close(&self) {
        self.send(Command::Close);
    }

    /// Status after every command sent before this call has been handled.
    pub async fn status(&self) -> Option<AutosaveStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx));
        rx.await.ok()
    }

    pub async fn location(&self) -> Option<EditorLocation> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Location(tx));
        rx.await.ok()
    }

    /// Latest published status, updated after every event.
    pub fn watch_status(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }

    pub fn subscribe_toasts(&self) -> broadcast::Receiver<ToastEvent> {
        self.toasts.subscribe()
    }
}

type InFlight = (SaveAttempt, JoinHandle<Result<SaveReceipt, GatewayError>>);

pub struct EditorSession {
    coordinator: AutosaveCoordinator,
    location: EditorLocation,
    gateway: Arc<dyn PersistenceGateway>,
    debouncer: Option<Debouncer<ResumeValues>>,
    in_flight: Option<InFlight>,
    status: watch::Sender<AutosaveStatus>,
    toasts: broadcast::Sender<ToastEvent>,
    failure_toast: Option<u64>,
    next_toast_id: u64,
}

impl EditorSession {
    /// Opens an editor on `initial` (empty for a new resume, hydrated from
    /// the store otherwise) and starts its task.
    pub fn spawn(
        initial: ResumeValues,
        mut location: EditorLocation,
        gateway: Arc<dyn PersistenceGateway>,
        config: SessionConfig,
    ) -> EditorHandle {
        let coordinator = AutosaveCoordinator::new(initial);
        location.resume_id = coordinator.resume_id().or(location.resume_id);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(coordinator.status());
        let (toasts_tx, _) = broadcast::channel(TOAST_CAPACITY);
        let (debouncer, debounced) = Debouncer::new(config.debounce);

        let session = EditorSession {
            coordinator,
            location,
            gateway,
            debouncer: Some(debouncer),
            in_flight: None,
            status: status_tx,
            toasts: toasts_tx.clone(),
            failure_toast: None,
            next_toast_id: 1,
        };
        tokio::spawn(session.run(commands_rx, debounced));

        EditorHandle {
            commands: commands_tx,
            status: status_rx,
            toasts: toasts_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut debounced: mpsc::UnboundedReceiver<ResumeValues>,
    ) {
        info!(location = %self.location.to_query(), "editor session opened");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Close) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(values) = debounced.recv() => {
                    if let Some(attempt) = self.coordinator.on_debounced(values) {
                        self.start(attempt);
                    }
                }
                result = wait_in_flight(&mut self.in_flight) => {
                    if let Some((attempt, _)) = self.in_flight.take() {
                        self.finish(attempt, result);
                    }
                }
            }
            self.status.send_replace(self.coordinator.status());
        }
        // Queued and later queries resolve to `None` instead of waiting on
        // the in-flight save.
        drop(commands);
        self.shutdown().await;
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Edit(values) => {
                self.coordinator.record_edit(values.clone());
                if let Some(debouncer) = &self.debouncer {
                    debouncer.push(values);
                }
            }
            Command::SetStep(step) => {
                self.location.step = step;
                debug!(location = %self.location.to_query(), "editor step changed");
            }
            Command::Retry => {
                if let Some(id) = self.failure_toast.take() {
                    self.emit(ToastEvent::Dismiss(id));
                }
                if let Some(attempt) = self.coordinator.retry() {
                    self.start(attempt);
                }
            }
            Command::Dismiss(id) => {
                if self.failure_toast == Some(id) {
                    self.failure_toast = None;
                }
                self.emit(ToastEvent::Dismiss(id));
            }
            Command::Status(reply) => {
                let _ = reply.send(self.coordinator.status());
            }
            Command::Location(reply) => {
                let _ = reply.send(self.location);
            }
            Command::Close => {}
        }
    }

    fn start(&mut self, attempt: SaveAttempt) {
        let gateway = Arc::clone(&self.gateway);
        let payload = attempt.payload.clone();
        let handle = tokio::spawn(async move { gateway.save(payload).await });
        self.in_flight = Some((attempt, handle));
    }

    fn finish(&mut self, attempt: SaveAttempt, result: Result<SaveReceipt, GatewayError>) {
        match self.coordinator.complete(attempt, result) {
            SaveOutcome::Saved { id, id_assigned } => {
                if let Some(toast) = self.failure_toast.take() {
                    self.emit(ToastEvent::Dismiss(toast));
                }
                if self.location.resume_id != Some(id) {
                    self.location.resume_id = Some(id);
                    info!(location = %self.location.to_query(), "editor location updated");
                } else if id_assigned {
                    debug!(resume_id = %id, "resume id adopted");
                }
            }
            SaveOutcome::Failed { message } => {
                debug!("save failed: {message}");
                if let Some(previous) = self.failure_toast.take() {
                    self.emit(ToastEvent::Dismiss(previous));
                }
                let toast = Toast {
                    id: self.next_toast_id,
                    message: SAVE_FAILED_MESSAGE.to_string(),
                    action: Some(ToastAction::Retry),
                };
                self.next_toast_id += 1;
                self.failure_toast = Some(toast.id);
                self.emit(ToastEvent::Show(toast));
            }
            SaveOutcome::Ignored => return,
        }
        if let Some(attempt) = self.coordinator.poll() {
            self.start(attempt);
        }
    }

    fn emit(&self, event: ToastEvent) {
        // No subscriber is not an error: the toast simply goes unseen.
        let _ = self.toasts.send(event);
    }

    async fn shutdown(mut self) {
        self.coordinator.deactivate();
        if let Some(debouncer) = self.debouncer.take() {
            debouncer.cancel();
        }
        if let Some((attempt, mut handle)) = self.in_flight.take() {
            let result = join_save(&mut handle).await;
            self.coordinator.complete(attempt, result);
        }
        info!("editor session closed");
    }
}

async fn join_save(
    handle: &mut JoinHandle<Result<SaveReceipt, GatewayError>>,
) -> Result<SaveReceipt, GatewayError> {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            warn!("save task did not complete: {e}");
            Err(GatewayError::Internal(e.to_string()))
        }
    }
}

/// Resolves when the in-flight save finishes; pending forever when idle.
/// The handle stays in place so a losing `select!` branch loses nothing.
async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> Result<SaveReceipt, GatewayError> {
    match in_flight {
        Some((_, handle)) => join_save(handle).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{Photo, PhotoBlob};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeGateway {
        id: Uuid,
        delay: Duration,
        failures: AtomicUsize,
        calls: Mutex<Vec<crate::autosave::SavePayload>>,
    }

    impl FakeGateway {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                id: Uuid::new_v4(),
                delay: Duration::from_millis(200),
                failures: AtomicUsize::new(failures),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<crate::autosave::SavePayload> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PersistenceGateway for FakeGateway {
        async fn save(
            &self,
            payload: crate::autosave::SavePayload,
        ) -> Result<SaveReceipt, GatewayError> {
            self.calls.lock().unwrap().push(payload.clone());
            tokio::time::sleep(self.delay).await;
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(GatewayError::Transport("503 Service Unavailable".into()));
            }
            let photo_url = matches!(payload.photo, Some(Photo::Pending(_)))
                .then(|| "blob://abc".to_string());
            Ok(SaveReceipt {
                id: payload.id.unwrap_or(self.id),
                photo_url,
            })
        }
    }

    fn with_summary(summary: &str) -> ResumeValues {
        ResumeValues {
            summary: Some(summary.to_string()),
            ..Default::default()
        }
    }

    fn open(gateway: Arc<FakeGateway>) -> EditorHandle {
        EditorSession::spawn(
            ResumeValues::default(),
            EditorLocation::default(),
            gateway,
            SessionConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_edit_saves_once() {
        let gateway = FakeGateway::new(0);
        let handle = open(gateway.clone());
        let mut status = handle.watch_status();

        handle.edit(with_summary("E"));
        handle.edit(with_summary("Eng"));
        handle.edit(with_summary("Engineer"));
        assert!(handle.status().await.unwrap().has_unsaved_changes);

        status.wait_for(|s| s.is_saving).await.unwrap();
        status.wait_for(|s| !s.is_saving).await.unwrap();

        let status = handle.status().await.unwrap();
        assert!(!status.has_unsaved_changes);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].values.summary.as_deref(), Some("Engineer"));
        assert!(calls[0].photo.is_none());
        assert_eq!(calls[0].id, None);

        let location = handle.location().await.unwrap();
        assert_eq!(location.resume_id, Some(gateway.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_save_reuses_id_and_skips_photo() {
        let gateway = FakeGateway::new(0);
        let handle = open(gateway.clone());
        let mut status = handle.watch_status();

        let mut doc = ResumeValues {
            photo: Photo::Pending(PhotoBlob::new("me.png", 9, Bytes::from_static(b"img"))),
            ..Default::default()
        };
        handle.edit(doc.clone());
        status.wait_for(|s| s.is_saving).await.unwrap();
        status.wait_for(|s| !s.is_saving).await.unwrap();

        doc.summary = Some("Engineer".into());
        handle.edit(doc);
        status.wait_for(|s| s.is_saving).await.unwrap();
        status.wait_for(|s| !s.is_saving).await.unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0].photo, Some(Photo::Pending(_))));
        assert!(calls[1].photo.is_none());
        assert_eq!(calls[1].id, Some(gateway.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_raises_retry_toast() {
        let gateway = FakeGateway::new(1);
        let handle = open(gateway.clone());
        let mut toasts = handle.subscribe_toasts();

        handle.edit(with_summary("Engineer"));
        let ToastEvent::Show(toast) = toasts.recv().await.unwrap() else {
            panic!("expected a toast");
        };
        assert_eq!(toast.message, "Unable to save changes");
        assert_eq!(toast.action, Some(ToastAction::Retry));

        // Same content after the failure: nothing is re-sent automatically.
        handle.edit(with_summary("Engineer"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(gateway.calls().len(), 1);
        assert!(!handle.status().await.unwrap().has_unsaved_changes);

        handle.retry();
        assert_eq!(toasts.recv().await.unwrap(), ToastEvent::Dismiss(toast.id));
        let mut status = handle.watch_status();
        status.wait_for(|s| !s.is_saving).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].values.summary.as_deref(), Some("Engineer"));
        assert_eq!(handle.location().await.unwrap().resume_id, Some(gateway.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_uploads_photo_from_failed_save() {
        let gateway = FakeGateway::new(1);
        let handle = open(gateway.clone());
        let mut toasts = handle.subscribe_toasts();

        handle.edit(ResumeValues {
            photo: Photo::Pending(PhotoBlob::new("me.png", 9, Bytes::from_static(b"img"))),
            ..Default::default()
        });
        assert!(matches!(toasts.recv().await.unwrap(), ToastEvent::Show(_)));

        handle.retry();
        assert!(matches!(toasts.recv().await.unwrap(), ToastEvent::Dismiss(_)));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0].photo, Some(Photo::Pending(_))));
        assert!(matches!(calls[1].photo, Some(Photo::Pending(_))));
        assert!(!handle.status().await.unwrap().has_unsaved_changes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_save_dismisses_failure_toast() {
        let gateway = FakeGateway::new(1);
        let handle = open(gateway.clone());
        let mut toasts = handle.subscribe_toasts();

        handle.edit(with_summary("Engineer"));
        let ToastEvent::Show(toast) = toasts.recv().await.unwrap() else {
            panic!("expected a toast");
        };

        handle.edit(with_summary("Senior Engineer"));
        assert_eq!(toasts.recv().await.unwrap(), ToastEvent::Dismiss(toast.id));
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queries_after_close_do_not_wait_for_save() {
        let gateway = FakeGateway::new(0);
        let handle = open(gateway.clone());
        let mut status = handle.watch_status();

        handle.edit(with_summary("Engineer"));
        status.wait_for(|s| s.is_saving).await.unwrap();
        handle.close();

        let reply = tokio::time::timeout(Duration::from_millis(50), handle.status())
            .await
            .expect("status query hung on the in-flight save");
        assert!(reply.is_none());
        assert!(handle.location().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_edit_after_failure_saves_again() {
        let gateway = FakeGateway::new(1);
        let handle = open(gateway.clone());
        let mut toasts = handle.subscribe_toasts();

        handle.edit(with_summary("Engineer"));
        assert!(matches!(toasts.recv().await.unwrap(), ToastEvent::Show(_)));

        handle.edit(with_summary("Senior Engineer"));
        tokio::time::sleep(Duration::from_secs(5)).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].values.summary.as_deref(), Some("Senior Engineer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_save() {
        let gateway = FakeGateway::new(0);
        let handle = open(gateway.clone());

        handle.edit(with_summary("Engineer"));
        handle.close();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(gateway.calls().is_empty());
        assert!(handle.status().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hydrated_editor_keeps_id_and_step() {
        let gateway = FakeGateway::new(0);
        let id = Uuid::new_v4();
        let initial = ResumeValues {
            id: Some(id),
            ..with_summary("Engineer")
        };
        let handle = EditorSession::spawn(
            initial,
            EditorLocation::from_query("step=skills"),
            gateway.clone(),
            SessionConfig::default(),
        );

        handle.set_step(EditorStep::Summary);
        let location = handle.location().await.unwrap();
        assert_eq!(location.step, EditorStep::Summary);
        assert_eq!(location.resume_id, Some(id));

        handle.edit(ResumeValues {
            id: Some(id),
            ..with_summary("Engineer")
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(gateway.calls().is_empty());
    }
}
