use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    actions, delete_guest as db_delete_guest, get_guest, get_wedding, insert_guest, list_guests,
    record_rsvp, resource_types, update_guest as db_update_guest, CreateGuestRequest, Guest,
    RsvpUpdateRequest, UpdateGuestRequest, User,
};
use crate::AppState;

use super::audit::audit_log;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_guest_category, validate_name, validate_optional_email, validate_optional_text,
    validate_phone,
};

const MAX_NOTES_LEN: usize = 1000;
const MAX_RSVP_MESSAGE_LEN: usize = 2000;

fn validate_create(req: &CreateGuestRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_name(&req.name, "Guest name"));
    errors.check("email", validate_optional_email(&req.email));
    errors.check("phone", validate_phone(&req.phone));
    errors.check("category", validate_guest_category(&req.category));
    errors.check("notes", validate_optional_text(&req.notes, "Notes", MAX_NOTES_LEN));
    if req.table_number.is_some_and(|t| t < 1) {
        errors.add("table_number", "Table number must be positive");
    }
    errors.finish()
}

fn validate_update(req: &UpdateGuestRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.name {
        errors.check("name", validate_name(name, "Guest name"));
    }
    errors.check("email", validate_optional_email(&req.email));
    errors.check("phone", validate_phone(&req.phone));
    if let Some(category) = &req.category {
        errors.check("category", validate_guest_category(category));
    }
    errors.check("notes", validate_optional_text(&req.notes, "Notes", MAX_NOTES_LEN));
    if req.table_number.is_some_and(|t| t < 1) {
        errors.add("table_number", "Table number must be positive");
    }
    errors.finish()
}

async fn load_guest(state: &AppState, id: &str) -> Result<Guest, ApiError> {
    get_guest(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Guest not found"))
}

pub async fn create_guest(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateGuestRequest>,
) -> Result<(StatusCode, Json<Guest>), ApiError> {
    validate_create(&req)?;
    access::authorize(&state.db, &user, &req.wedding_id, Operation::ManageGuests).await?;

    let guest = insert_guest(&state.db, &req).await?;
    tracing::debug!(guest_id = %guest.id, wedding_id = %guest.wedding_id, "Guest added");
    Ok((StatusCode::CREATED, Json(guest)))
}

pub async fn list_wedding_guests(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<Guest>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::ListGuests).await?;
    Ok(Json(list_guests(&state.db, &wedding_id).await?))
}

/// Administrative edit, including resetting an RSVP to pending
pub async fn update_guest(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateGuestRequest>,
) -> Result<Json<Guest>, ApiError> {
    validate_update(&req)?;
    let guest = load_guest(&state, &id).await?;
    access::authorize(&state.db, &user, &guest.wedding_id, Operation::ManageGuests).await?;

    let updated = db_update_guest(&state.db, &guest, &req).await?;
    Ok(Json(updated))
}

pub async fn delete_guest(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let guest = load_guest(&state, &id).await?;
    access::authorize(&state.db, &user, &guest.wedding_id, Operation::ManageGuests).await?;

    db_delete_guest(&state.db, &guest.id).await?;
    audit_log(
        &state,
        actions::GUEST_DELETE,
        resource_types::GUEST,
        Some(&guest.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({ "wedding_id": guest.wedding_id, "name": guest.name })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Guest-facing RSVP submission. Needs no account, only a public wedding.
pub async fn submit_rsvp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RsvpUpdateRequest>,
) -> Result<Json<Guest>, ApiError> {
    if !req.rsvp_status.is_guest_submittable() {
        return Err(ApiError::validation_field(
            "rsvp_status",
            "RSVP status must be confirmed, declined or maybe",
        ));
    }
    let mut errors = ValidationErrorBuilder::new();
    errors.check("message", validate_optional_text(&req.message, "Message", MAX_RSVP_MESSAGE_LEN));
    errors.finish()?;

    let guest = load_guest(&state, &id).await?;
    let is_public = get_wedding(&state.db, &guest.wedding_id)
        .await?
        .is_some_and(|w| w.is_public);
    if !is_public {
        return Err(ApiError::not_found("Guest not found"));
    }

    let updated = record_rsvp(&state.db, &guest.id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Guest not found"))?;

    tracing::info!(
        guest_id = %updated.id,
        wedding_id = %updated.wedding_id,
        rsvp_status = %updated.rsvp_status,
        "RSVP recorded"
    );
    Ok(Json(updated))
}
