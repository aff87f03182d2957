//! Audit log endpoint and recording helper.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::db::{list_audit_logs, log_audit, AuditLogListResponse, AuditLogQuery, User};
use crate::AppState;

use super::error::ApiError;

/// Client address as reported by a reverse proxy
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first_ip) = forwarded.split(',').next() {
            let ip = first_ip.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Record an audit event. Failures are logged and never fail the request.
pub async fn audit_log(
    state: &AppState,
    action: &str,
    resource_type: &str,
    resource_id: Option<&str>,
    user_id: Option<&str>,
    headers: &HeaderMap,
    details: Option<serde_json::Value>,
) {
    let ip_address = extract_client_ip(headers);
    if let Err(e) = log_audit(
        &state.db,
        action,
        resource_type,
        resource_id,
        user_id,
        ip_address.as_deref(),
        details,
    )
    .await
    {
        tracing::warn!(
            action = action,
            resource_type = resource_type,
            error = %e,
            "Failed to create audit log entry"
        );
    }
}

/// List audit logs with filtering and pagination (admin only)
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogListResponse>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }
    let result = list_audit_logs(&state.db, &query).await?;
    Ok(Json(result))
}
