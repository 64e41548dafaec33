//! Autosave gateway that talks to the Resume API over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::autosave::gateway::{GatewayError, PersistenceGateway, SavePayload, SaveReceipt};
use crate::models::document::{Photo, ResumeValues};
use crate::resume::form::{PHOTO_ACTION_PART, PHOTO_ACTION_REMOVE, PHOTO_PART, RESUME_PART};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    save_url: String,
    user_id: Uuid,
}

impl HttpGateway {
    pub fn new(base_url: &str, user_id: Uuid) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            save_url: format!("{}/api/v1/resumes", base_url.trim_end_matches('/')),
            user_id,
        })
    }
}

/// Encodes a save as the multipart form the Resume API expects.
fn build_form(payload: &SavePayload) -> Result<Form, GatewayError> {
    let values = ResumeValues {
        id: payload.id,
        photo: Photo::Unset,
        ..payload.values.clone()
    };
    let json = serde_json::to_string(&values)
        .map_err(|e| GatewayError::Internal(format!("failed to encode resume: {e}")))?;
    let resume = Part::text(json)
        .mime_str("application/json")
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    let mut form = Form::new().part(RESUME_PART, resume);

    match &payload.photo {
        Some(Photo::Pending(blob)) => {
            let mut part = Part::bytes(blob.bytes.to_vec()).file_name(blob.name.clone());
            if let Some(content_type) = &blob.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
            }
            form = form.part(PHOTO_PART, part);
        }
        Some(Photo::Removed) => {
            form = form.text(PHOTO_ACTION_PART, PHOTO_ACTION_REMOVE);
        }
        // A remote reference is already stored; nothing to send.
        Some(Photo::Remote(_)) | Some(Photo::Unset) | None => {}
    }
    Ok(form)
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    async fn save(&self, payload: SavePayload) -> Result<SaveReceipt, GatewayError> {
        let form = build_form(&payload)?;
        let response = self
            .client
            .post(&self.save_url)
            .query(&[("user_id", self.user_id)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = payload.id {
                return Err(GatewayError::NotFound(id));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: SaveReceipt = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("unreadable save response: {e}")))?;
        debug!(resume_id = %receipt.id, "resume saved over HTTP");
        Ok(receipt)
    }
}
