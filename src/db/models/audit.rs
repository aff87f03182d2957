//! Audit trail of administrative and access-control actions.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::now_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub details: Option<String>,
    pub created_at: String,
}

/// Response for listing audit logs with pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogListResponse {
    pub items: Vec<AuditLog>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Query parameters for filtering audit logs
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuditLogQuery {
    /// Filter by action (e.g., "wedding.create")
    pub action: Option<String>,
    /// Filter by resource type (e.g., "wedding", "guest")
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<i64>,
    /// Items per page (defaults to 50, max 100)
    pub per_page: Option<i64>,
}

pub mod actions {
    // Auth
    pub const AUTH_REGISTER: &str = "auth.register";
    pub const AUTH_LOGIN: &str = "auth.login";
    pub const AUTH_LOGOUT: &str = "auth.logout";

    // Weddings
    pub const WEDDING_CREATE: &str = "wedding.create";
    pub const WEDDING_UPDATE: &str = "wedding.update";
    pub const WEDDING_DELETE: &str = "wedding.delete";

    // Guests
    pub const GUEST_DELETE: &str = "guest.delete";

    // Access grants
    pub const ACCESS_GRANT: &str = "access.grant";
    pub const ACCESS_UPDATE: &str = "access.update";
    pub const ACCESS_REVOKE: &str = "access.revoke";

    // Collaborator invitations
    pub const COLLABORATOR_INVITE: &str = "collaborator.invite";
    pub const COLLABORATOR_STATUS: &str = "collaborator.status";
    pub const COLLABORATOR_ACCEPT: &str = "collaborator.accept";

    // Users
    pub const USER_UPDATE: &str = "user.update";
}

pub mod resource_types {
    pub const USER: &str = "user";
    pub const WEDDING: &str = "wedding";
    pub const GUEST: &str = "guest";
    pub const WEDDING_ACCESS: &str = "wedding_access";
    pub const COLLABORATOR: &str = "collaborator";
}

/// Log an audit event to the database
pub async fn log_audit(
    db: &SqlitePool,
    action: &str,
    resource_type: &str,
    resource_id: Option<&str>,
    user_id: Option<&str>,
    ip_address: Option<&str>,
    details: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let details_json = details.map(|d| d.to_string());

    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, action, resource_type, resource_id, user_id, ip_address, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(action)
    .bind(resource_type)
    .bind(resource_id)
    .bind(user_id)
    .bind(ip_address)
    .bind(&details_json)
    .bind(now_rfc3339())
    .execute(db)
    .await?;

    tracing::debug!(
        action = action,
        resource_type = resource_type,
        resource_id = resource_id,
        user_id = user_id,
        "Audit log recorded"
    );

    Ok(())
}

/// List audit logs with filtering and pagination
pub async fn list_audit_logs(
    db: &SqlitePool,
    query: &AuditLogQuery,
) -> Result<AuditLogListResponse, sqlx::Error> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    for (column, value) in [
        ("action", &query.action),
        ("resource_type", &query.resource_type),
        ("resource_id", &query.resource_id),
        ("user_id", &query.user_id),
    ] {
        if let Some(value) = value {
            conditions.push(format!("{} = ?", column));
            bindings.push(value.clone());
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) as count FROM audit_logs {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for binding in &bindings {
        count_query = count_query.bind(binding);
    }
    let total = count_query.fetch_one(db).await?;

    let sql = format!(
        "SELECT * FROM audit_logs {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut query_builder = sqlx::query_as::<_, AuditLog>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }
    query_builder = query_builder.bind(per_page).bind(offset);

    let items = query_builder.fetch_all(db).await?;

    let total_pages = (total + per_page - 1) / per_page;

    Ok(AuditLogListResponse {
        items,
        total,
        page,
        per_page,
        total_pages,
    })
}
