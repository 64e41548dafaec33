//! Axum route handlers for AI drafting.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::generation::summary::{generate_summary, GenerateSummaryInput, GenerateSummaryResponse};
use crate::generation::work_experience::{generate_work_experience, GenerateWorkExperienceInput};
use crate::models::document::WorkExperience;
use crate::state::AppState;

/// POST /api/v1/ai/summary
///
/// Drafts a summary from the job title, experience, education and skills
/// currently in the editor.
pub async fn handle_generate_summary(
    State(state): State<AppState>,
    Json(request): Json<GenerateSummaryInput>,
) -> Result<Json<GenerateSummaryResponse>, AppError> {
    let summary = generate_summary(&request, &state.llm).await?;
    Ok(Json(GenerateSummaryResponse { summary }))
}

/// POST /api/v1/ai/work-experience
pub async fn handle_generate_work_experience(
    State(state): State<AppState>,
    Json(request): Json<GenerateWorkExperienceInput>,
) -> Result<Json<WorkExperience>, AppError> {
    let experience = generate_work_experience(&request, &state.llm).await?;
    Ok(Json(experience))
}
