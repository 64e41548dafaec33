//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::autosave::gateway::{SavePayload, SaveReceipt};
use crate::errors::AppError;
use crate::models::document::{Photo, PhotoBlob, ResumeValues};
use crate::resume::form::{parse_photo_action, PHOTO_ACTION_PART, PHOTO_PART, RESUME_PART};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeListItem {
    #[serde(flatten)]
    pub resume: ResumeValues,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeListItem>,
    pub total_count: usize,
    pub can_create: bool,
}

/// POST /api/v1/resumes
///
/// Autosave endpoint. Creates the resume when the body carries no id.
pub async fn handle_save(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    multipart: Multipart,
) -> Result<Json<SaveReceipt>, AppError> {
    let payload = read_save_form(multipart).await?;
    let receipt = state.store.save(params.user_id, payload).await?;
    Ok(Json(receipt))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let records = state.store.list(params.user_id).await?;
    let total_count = records.len();
    let resumes = records
        .into_iter()
        .map(|record| {
            let updated_at = record.resume.updated_at;
            ResumeListItem {
                resume: record.into_values(),
                updated_at,
            }
        })
        .collect();

    Ok(Json(ResumeListResponse {
        resumes,
        total_count,
        can_create: state.store.can_create(total_count as i64),
    }))
}

/// GET /api/v1/resumes/:id
///
/// Returns the resume in the shape the editor hydrates from.
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeValues>, AppError> {
    let record = state.store.get(id, params.user_id).await?;
    Ok(Json(record.into_values()))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.store.delete(id, params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_save_form(mut multipart: Multipart) -> Result<SavePayload, AppError> {
    let mut values: Option<ResumeValues> = None;
    let mut photo: Option<Photo> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            RESUME_PART => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable resume part: {e}")))?;
                let parsed = serde_json::from_str::<ResumeValues>(&text)
                    .map_err(|e| AppError::Validation(format!("Invalid resume JSON: {e}")))?;
                values = Some(parsed);
            }
            PHOTO_PART => {
                let file_name = field.file_name().unwrap_or("photo").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable photo part: {e}")))?;
                let mut blob = PhotoBlob::new(file_name, 0, bytes);
                blob.content_type = content_type;
                photo = Some(Photo::Pending(blob));
            }
            PHOTO_ACTION_PART => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable photo action: {e}")))?;
                // An uploaded file wins over any action.
                if !matches!(photo, Some(Photo::Pending(_))) {
                    photo = parse_photo_action(&text).ok_or_else(|| {
                        AppError::Validation(format!("Unknown photo action '{}'", text.trim()))
                    })?;
                }
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field '{other}'");
            }
        }
    }

    let values = values
        .ok_or_else(|| AppError::Validation(format!("Missing '{RESUME_PART}' part")))?;
    Ok(SavePayload {
        id: values.id,
        values,
        photo,
    })
}
