//! The persistence boundary the autosave core saves through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::document::{Photo, ResumeValues};

/// What one save sends to the gateway.
#[derive(Debug, Clone)]
pub struct SavePayload {
    /// Full document state. Its `photo` field is ignored; see `photo`.
    pub values: ResumeValues,
    /// `None` tells the gateway to leave the stored photo as it is.
    pub photo: Option<Photo>,
    /// Absent until the first successful save.
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub id: Uuid,
    /// Set when the stored photo has a URL after the save.
    pub photo_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("save rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("resume {0} not found")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Accepts a full document state and returns its canonical identifier.
///
/// Implementations must not panic on bad input; every failure is reported
/// as a `GatewayError` so the coordinator can enter its failure state.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn save(&self, payload: SavePayload) -> Result<SaveReceipt, GatewayError>;
}
