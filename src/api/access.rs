//! Wedding access grant management.
//!
//! Grants let the couple (or an admin) hand out scoped permissions on a
//! wedding to other accounts, typically guest managers. Only owners and
//! admins can manage grants.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    actions, delete_access, get_access, get_user, get_user_by_email, insert_access,
    list_access_for_wedding, resource_types, update_access as db_update_access,
    GrantAccessRequest, UpdateAccessRequest, User, WeddingAccess, WeddingAccessResponse,
};
use crate::AppState;

use super::audit::audit_log;
use super::error::ApiError;
use super::validation::validate_email;

fn to_response(grant: WeddingAccess, grantee: &User) -> WeddingAccessResponse {
    let permissions = grant.permissions();
    WeddingAccessResponse {
        id: grant.id,
        wedding_id: grant.wedding_id,
        user_id: grant.user_id,
        user_email: grantee.email.clone(),
        user_name: grantee.name.clone(),
        access_level: grant.access_level,
        permissions,
        granted_by: grant.granted_by,
        created_at: grant.created_at,
    }
}

async fn load_grantee(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn list_wedding_access(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<WeddingAccessResponse>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::ManageAccess).await?;
    Ok(Json(list_access_for_wedding(&state.db, &wedding_id).await?))
}

/// Grant access to a user identified by id or email. Permissions default to
/// the level's defaults when omitted.
pub async fn grant_access(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Json(req): Json<GrantAccessRequest>,
) -> Result<(StatusCode, Json<WeddingAccessResponse>), ApiError> {
    let (wedding, _) =
        access::authorize(&state.db, &user, &req.wedding_id, Operation::ManageAccess).await?;

    let grantee = match (req.user_id.as_deref(), req.email.as_deref()) {
        (Some(user_id), _) => load_grantee(&state, user_id).await?,
        (None, Some(email)) => {
            validate_email(email).map_err(|msg| ApiError::validation_field("email", msg))?;
            get_user_by_email(&state.db, email.trim())
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?
        }
        (None, None) => {
            return Err(ApiError::validation_field(
                "user_id",
                "Either user_id or email is required",
            ));
        }
    };

    if grantee.id == wedding.user_id {
        return Err(ApiError::bad_request(
            "The wedding owner already has full access",
        ));
    }

    let permissions = req
        .permissions
        .unwrap_or_else(|| req.access_level.default_permissions());

    let grant = insert_access(
        &state.db,
        &wedding.id,
        &grantee.id,
        req.access_level,
        &permissions,
        Some(&user.id),
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        err if err.status() == StatusCode::CONFLICT => {
            ApiError::conflict("User already has access to this wedding")
        }
        err => err,
    })?;

    audit_log(
        &state,
        actions::ACCESS_GRANT,
        resource_types::WEDDING_ACCESS,
        Some(&grant.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "wedding_id": wedding.id,
            "grantee_id": grantee.id,
            "access_level": grant.access_level,
        })),
    )
    .await;

    tracing::info!(
        wedding_id = %wedding.id,
        grantee = %grantee.email,
        access_level = %grant.access_level,
        "Wedding access granted"
    );

    Ok((StatusCode::CREATED, Json(to_response(grant, &grantee))))
}

/// Change a grant's level and/or permissions. A new level without explicit
/// permissions resets them to that level's defaults.
pub async fn update_access(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateAccessRequest>,
) -> Result<Json<WeddingAccessResponse>, ApiError> {
    let existing = get_access(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Access grant not found"))?;
    access::authorize(&state.db, &user, &existing.wedding_id, Operation::ManageAccess).await?;

    let level = req.access_level.unwrap_or_else(|| existing.level());
    let permissions = match (req.permissions, req.access_level) {
        (Some(permissions), _) => permissions,
        (None, Some(level)) => level.default_permissions(),
        (None, None) => existing.permissions(),
    };

    let grant = db_update_access(&state.db, &id, level, &permissions)
        .await?
        .ok_or_else(|| ApiError::not_found("Access grant not found"))?;
    let grantee = load_grantee(&state, &grant.user_id).await?;

    audit_log(
        &state,
        actions::ACCESS_UPDATE,
        resource_types::WEDDING_ACCESS,
        Some(&grant.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "wedding_id": grant.wedding_id,
            "access_level": grant.access_level,
        })),
    )
    .await;

    Ok(Json(to_response(grant, &grantee)))
}

pub async fn revoke_access(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = get_access(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Access grant not found"))?;
    access::authorize(&state.db, &user, &existing.wedding_id, Operation::ManageAccess).await?;

    if !delete_access(&state.db, &id).await? {
        return Err(ApiError::not_found("Access grant not found"));
    }

    audit_log(
        &state,
        actions::ACCESS_REVOKE,
        resource_types::WEDDING_ACCESS,
        Some(&id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "wedding_id": existing.wedding_id,
            "user_id": existing.user_id,
        })),
    )
    .await;

    tracing::info!(
        wedding_id = %existing.wedding_id,
        user_id = %existing.user_id,
        "Wedding access revoked"
    );

    Ok(StatusCode::NO_CONTENT)
}
