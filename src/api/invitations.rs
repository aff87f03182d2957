use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    get_guest, get_invitation, insert_invitation, list_invitations, list_invitations_for_guest,
    record_reminder, update_invitation_status, CreateInvitationRequest, Invitation,
    UpdateInvitationStatusRequest, User,
};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_optional_text;

async fn load_invitation(state: &AppState, id: &str) -> Result<Invitation, ApiError> {
    get_invitation(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))
}

/// Create an invitation record for a guest. The wedding is the guest's own.
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    let guest = get_guest(&state.db, &req.guest_id)
        .await?
        .ok_or_else(|| ApiError::validation_field("guest_id", "Guest not found"))?;
    access::authorize(&state.db, &user, &guest.wedding_id, Operation::ManageGuests).await?;

    let invitation = insert_invitation(&state.db, &guest.wedding_id, &guest.id, req.channel).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn list_wedding_invitations(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::ManageGuests).await?;
    Ok(Json(list_invitations(&state.db, &wedding_id).await?))
}

pub async fn list_guest_invitations(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(guest_id): Path<String>,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    let guest = get_guest(&state.db, &guest_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Guest not found"))?;
    access::authorize(&state.db, &user, &guest.wedding_id, Operation::ManageGuests).await?;
    Ok(Json(list_invitations_for_guest(&state.db, &guest.id).await?))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateInvitationStatusRequest>,
) -> Result<Json<Invitation>, ApiError> {
    validate_optional_text(&req.error_message, "Error message", 1000)
        .map_err(|msg| ApiError::validation_field("error_message", msg))?;

    let invitation = load_invitation(&state, &id).await?;
    access::authorize(&state.db, &user, &invitation.wedding_id, Operation::ManageGuests).await?;

    let updated = update_invitation_status(&state.db, &id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;
    Ok(Json(updated))
}

pub async fn send_reminder(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Invitation>, ApiError> {
    let invitation = load_invitation(&state, &id).await?;
    access::authorize(&state.db, &user, &invitation.wedding_id, Operation::ManageGuests).await?;

    let updated = record_reminder(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;
    tracing::info!(
        invitation_id = %updated.id,
        reminder_count = updated.reminder_count,
        "Invitation reminder recorded"
    );
    Ok(Json(updated))
}
