//! Platform administration endpoints. All require the global admin role.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::db::{
    actions, get_user, list_all_weddings, list_users as db_list_users, platform_stats,
    resource_types, update_user as db_update_user, PlatformStats, UpdateUserRequest, User,
    UserResponse, UserRole, WeddingResponse,
};
use crate::AppState;

use super::audit::audit_log;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::validate_name;

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&user)?;
    let users = db_list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Update a user's name, role or subscription flag
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&user)?;

    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.name {
        errors.check("name", validate_name(name, "Name"));
    }
    let role = match req.role.as_deref() {
        Some(role) => match role.parse::<UserRole>() {
            Ok(role) => Some(role),
            Err(msg) => {
                errors.add("role", msg);
                None
            }
        },
        None => None,
    };
    errors.finish()?;

    if id == user.id && role.is_some_and(|r| r != UserRole::Admin) {
        return Err(ApiError::bad_request("You cannot remove your own admin role"));
    }

    get_user(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let updated = db_update_user(
        &state.db,
        &id,
        req.name.as_deref().map(str::trim),
        role,
        req.has_paid_subscription,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    audit_log(
        &state,
        actions::USER_UPDATE,
        resource_types::USER,
        Some(&updated.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({
            "role": req.role,
            "has_paid_subscription": req.has_paid_subscription,
        })),
    )
    .await;

    tracing::info!(user_id = %updated.id, role = %updated.role, "User updated by admin");

    Ok(Json(UserResponse::from(updated)))
}

pub async fn list_weddings(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<WeddingResponse>>, ApiError> {
    require_admin(&user)?;
    let weddings = list_all_weddings(&state.db).await?;
    Ok(Json(weddings.into_iter().map(WeddingResponse::from).collect()))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<PlatformStats>, ApiError> {
    require_admin(&user)?;
    Ok(Json(platform_stats(&state.db).await?))
}
