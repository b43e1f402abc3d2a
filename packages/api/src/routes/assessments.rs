//! Self-assessment endpoints. Results are private to the user who submitted them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::assessment::{Instrument, InstrumentInfo};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::{AssessmentResult, NewAssessmentResult};
use crate::state::AppState;
use super::JsonBody;

const MAX_NOTES_LEN: usize = 2_000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/assessments/instruments", get(list_instruments))
        .route(
            "/api/assessments",
            get(list_assessments).post(create_assessment),
        )
        .route(
            "/api/assessments/{id}",
            get(get_assessment).delete(delete_assessment),
        )
}

#[derive(Debug, Deserialize)]
struct CreateAssessmentRequest {
    instrument: String,
    answers: Vec<u8>,
    notes: Option<String>,
}

async fn list_instruments() -> Json<Vec<InstrumentInfo>> {
    Json(Instrument::ALL.iter().map(Instrument::info).collect())
}

async fn create_assessment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<AssessmentResult>), ApiError> {
    let instrument: Instrument = req
        .instrument
        .parse()
        .map_err(|e| ApiError::invalid("instrument", e))?;
    let score = instrument
        .score(&req.answers)
        .map_err(|e| ApiError::invalid("answers", e.to_string()))?;

    let notes = req
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(ApiError::invalid(
            "notes",
            format!("Notes must be at most {} characters", MAX_NOTES_LEN),
        ));
    }

    let result = state
        .store
        .create_assessment(NewAssessmentResult {
            user_id: user.id,
            instrument,
            answers: req.answers,
            score,
            notes,
        })
        .await?;

    if result.crisis_flag {
        tracing::warn!(assessment_id = %result.id, user_id = %user.id, "Assessment raised crisis flag");
    }
    Ok((StatusCode::CREATED, Json(result)))
}

async fn list_assessments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<AssessmentResult>>, ApiError> {
    Ok(Json(state.store.list_assessments(user.id).await?))
}

/// Load a result owned by `user_id`. Other users' results look missing.
async fn load_owned(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<AssessmentResult, ApiError> {
    state
        .store
        .get_assessment(id)
        .await?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment {} not found", id)))
}

async fn get_assessment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentResult>, ApiError> {
    Ok(Json(load_owned(&state, id, user.id).await?))
}

async fn delete_assessment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    load_owned(&state, id, user.id).await?;
    state.store.delete_assessment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
