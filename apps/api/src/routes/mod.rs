pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::generation::handlers as ai;
use crate::resume::form::MAX_PHOTO_BYTES;
use crate::resume::handlers as resumes;
use crate::state::AppState;

/// Room for the resume JSON next to a maximum-size photo.
const SAVE_BODY_LIMIT: usize = MAX_PHOTO_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route(
            "/api/v1/resumes",
            post(resumes::handle_save)
                .layer(DefaultBodyLimit::max(SAVE_BODY_LIMIT))
                .get(resumes::handle_list),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get).delete(resumes::handle_delete),
        )
        // AI drafting
        .route("/api/v1/ai/summary", post(ai::handle_generate_summary))
        .route(
            "/api/v1/ai/work-experience",
            post(ai::handle_generate_work_experience),
        )
        .with_state(state)
}
