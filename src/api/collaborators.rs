//! Collaborator invitations.
//!
//! Owners and admins invite helpers by email. The invitee signs in with that
//! email and accepts, which creates their `wedding_access` grant with the
//! level and permissions chosen at invitation time. Revoking an accepted
//! invitation also removes the grant.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    accept_collaborator, actions, delete_access, find_access, find_pending_collaborator,
    get_collaborator, get_user, get_user_by_email, insert_collaborator, list_collaborators,
    resource_types, update_collaborator_status, AcceptCollaboratorRequest, Collaborator,
    CollaboratorResponse, CollaboratorStatus, CreateCollaboratorRequest,
    UpdateCollaboratorStatusRequest, User,
};
use crate::AppState;

use super::audit::audit_log;
use super::error::{ApiError, ErrorCode, ValidationErrorBuilder};
use super::validation::{validate_email, validate_optional_text};

const MAX_NAME_LEN: usize = 100;

async fn load_collaborator(state: &AppState, id: &str) -> Result<Collaborator, ApiError> {
    get_collaborator(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Collaborator not found"))
}

/// Invite a collaborator by email
pub async fn create_collaborator(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Json(req): Json<CreateCollaboratorRequest>,
) -> Result<(StatusCode, Json<CollaboratorResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&req.email));
    errors.check("name", validate_optional_text(&req.name, "Name", MAX_NAME_LEN));
    errors.finish()?;

    let (wedding, _) =
        access::authorize(&state.db, &user, &req.wedding_id, Operation::ManageAccess).await?;

    let email = req.email.trim();
    if let Some(owner) = get_user(&state.db, &wedding.user_id).await? {
        if owner.email.eq_ignore_ascii_case(email) {
            return Err(ApiError::bad_request(
                "The wedding owner already has full access",
            ));
        }
    }
    if let Some(existing) = get_user_by_email(&state.db, email).await? {
        if find_access(&state.db, &wedding.id, &existing.id).await?.is_some() {
            return Err(ApiError::conflict("User already has access to this wedding"));
        }
    }

    let permissions = req
        .permissions
        .unwrap_or_else(|| req.access_level.default_permissions());

    let collaborator = insert_collaborator(&state.db, &req, &permissions, &user.id)
        .await
        .map_err(|e| match ApiError::from(e) {
            err if err.code() == ErrorCode::Conflict => {
                ApiError::conflict("This email has already been invited")
            }
            err => err,
        })?;

    audit_log(
        &state,
        actions::COLLABORATOR_INVITE,
        resource_types::COLLABORATOR,
        Some(&collaborator.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "wedding_id": wedding.id,
            "email": collaborator.email,
            "access_level": collaborator.access_level,
        })),
    )
    .await;

    tracing::info!(
        wedding_id = %wedding.id,
        email = %collaborator.email,
        access_level = %collaborator.access_level,
        "Collaborator invited"
    );

    Ok((StatusCode::CREATED, Json(collaborator.into())))
}

pub async fn list_wedding_collaborators(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<CollaboratorResponse>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::ManageAccess).await?;
    let collaborators = list_collaborators(&state.db, &wedding_id).await?;
    Ok(Json(collaborators.into_iter().map(Into::into).collect()))
}

/// Change an invitation's status. Managers may revoke or re-open; the
/// invitee may decline a pending invitation.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateCollaboratorStatusRequest>,
) -> Result<Json<CollaboratorResponse>, ApiError> {
    let collaborator = load_collaborator(&state, &id).await?;

    if req.status == CollaboratorStatus::Accepted {
        return Err(ApiError::validation_field(
            "status",
            "Invitations are accepted through /api/collaborators/accept",
        ));
    }

    let is_invitee = user.email.eq_ignore_ascii_case(&collaborator.email);
    if !(is_invitee && req.status == CollaboratorStatus::Declined) {
        access::authorize(&state.db, &user, &collaborator.wedding_id, Operation::ManageAccess)
            .await?;
    }

    let current = collaborator.status();
    if !current.can_become(req.status) {
        return Err(ApiError::validation_field(
            "status",
            format!("Cannot change status from {} to {}", current, req.status),
        ));
    }

    if current == CollaboratorStatus::Accepted {
        if let Some(user_id) = collaborator.user_id.as_deref() {
            if let Some(grant) = find_access(&state.db, &collaborator.wedding_id, user_id).await? {
                delete_access(&state.db, &grant.id).await?;
            }
        }
    }

    let updated = update_collaborator_status(&state.db, &id, req.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Collaborator not found"))?;

    audit_log(
        &state,
        actions::COLLABORATOR_STATUS,
        resource_types::COLLABORATOR,
        Some(&updated.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "wedding_id": updated.wedding_id,
            "from": current.to_string(),
            "to": updated.status,
        })),
    )
    .await;

    Ok(Json(updated.into()))
}

/// Accept the signed-in user's pending invitation to a wedding
pub async fn accept(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Json(req): Json<AcceptCollaboratorRequest>,
) -> Result<Json<CollaboratorResponse>, ApiError> {
    let pending = find_pending_collaborator(&state.db, &req.wedding_id, &user.email)
        .await?
        .ok_or_else(|| ApiError::not_found("Collaborator invitation not found"))?;

    let (accepted, grant) = accept_collaborator(&state.db, &pending, &user.id)
        .await
        .map_err(|e| match ApiError::from(e) {
            err if err.code() == ErrorCode::Conflict => {
                ApiError::conflict("You already have access to this wedding")
            }
            err if err.code() == ErrorCode::NotFound => {
                ApiError::not_found("Collaborator invitation not found")
            }
            err => err,
        })?;

    audit_log(
        &state,
        actions::COLLABORATOR_ACCEPT,
        resource_types::COLLABORATOR,
        Some(&accepted.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "wedding_id": accepted.wedding_id,
            "grant_id": grant.id,
            "access_level": grant.access_level,
        })),
    )
    .await;

    tracing::info!(
        wedding_id = %accepted.wedding_id,
        user_id = %user.id,
        access_level = %grant.access_level,
        "Collaborator invitation accepted"
    );

    Ok(Json(accepted.into()))
}
