use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    complete_milestone as db_complete_milestone, delete_milestone as db_delete_milestone,
    get_milestone, insert_milestone, list_milestones, update_milestone as db_update_milestone,
    CreateMilestoneRequest, Milestone, UpdateMilestoneRequest, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_date, validate_name, validate_optional_date, validate_optional_text};

const MAX_TEXT_LEN: usize = 1000;

async fn load_milestone(state: &AppState, id: &str) -> Result<Milestone, ApiError> {
    get_milestone(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Milestone not found"))
}

pub async fn list_wedding_milestones(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<Milestone>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::ViewWedding).await?;
    Ok(Json(list_milestones(&state.db, &wedding_id).await?))
}

pub async fn create_milestone(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateMilestoneRequest>,
) -> Result<(StatusCode, Json<Milestone>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("title", validate_name(&req.title, "Title"));
    errors.check("target_date", validate_date(&req.target_date, "Target date"));
    errors.check("description", validate_optional_text(&req.description, "Description", MAX_TEXT_LEN));
    errors.check(
        "celebration_message",
        validate_optional_text(&req.celebration_message, "Celebration message", MAX_TEXT_LEN),
    );
    errors.finish()?;

    access::authorize(&state.db, &user, &req.wedding_id, Operation::EditDetails).await?;

    let milestone = insert_milestone(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

pub async fn update_milestone(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateMilestoneRequest>,
) -> Result<Json<Milestone>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        errors.check("title", validate_name(title, "Title"));
    }
    errors.check("target_date", validate_optional_date(&req.target_date, "Target date"));
    errors.check("description", validate_optional_text(&req.description, "Description", MAX_TEXT_LEN));
    errors.check(
        "celebration_message",
        validate_optional_text(&req.celebration_message, "Celebration message", MAX_TEXT_LEN),
    );
    errors.finish()?;

    let milestone = load_milestone(&state, &id).await?;
    access::authorize(&state.db, &user, &milestone.wedding_id, Operation::EditDetails).await?;

    Ok(Json(db_update_milestone(&state.db, &milestone, &req).await?))
}

pub async fn complete_milestone(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Milestone>, ApiError> {
    let milestone = load_milestone(&state, &id).await?;
    access::authorize(&state.db, &user, &milestone.wedding_id, Operation::EditDetails).await?;

    Ok(Json(db_complete_milestone(&state.db, &milestone).await?))
}

pub async fn delete_milestone(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let milestone = load_milestone(&state, &id).await?;
    access::authorize(&state.db, &user, &milestone.wedding_id, Operation::EditDetails).await?;

    db_delete_milestone(&state.db, &milestone.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
