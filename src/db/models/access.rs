//! Per-wedding access grants.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

/// Level of a wedding access grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Owner,
    GuestManager,
    Viewer,
}

impl AccessLevel {
    /// Permissions stored on a new grant when the caller supplies none
    pub fn default_permissions(self) -> WeddingPermissions {
        match self {
            AccessLevel::Owner => WeddingPermissions::all(),
            AccessLevel::GuestManager => WeddingPermissions {
                can_manage_guests: true,
                can_view_analytics: true,
                ..WeddingPermissions::none()
            },
            AccessLevel::Viewer => WeddingPermissions::none(),
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::Owner => write!(f, "owner"),
            AccessLevel::GuestManager => write!(f, "guest_manager"),
            AccessLevel::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(AccessLevel::Owner),
            "guest_manager" => Ok(AccessLevel::GuestManager),
            "viewer" => Ok(AccessLevel::Viewer),
            _ => Err(format!("Unknown access level: {}", s)),
        }
    }
}

impl From<String> for AccessLevel {
    fn from(s: String) -> Self {
        // Unknown levels degrade to the least privileged one
        s.parse().unwrap_or(AccessLevel::Viewer)
    }
}

/// Permission bits carried by a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WeddingPermissions {
    pub can_edit_details: bool,
    pub can_manage_guests: bool,
    pub can_view_analytics: bool,
    pub can_manage_photos: bool,
    pub can_edit_guest_book: bool,
}

impl WeddingPermissions {
    pub fn all() -> Self {
        Self {
            can_edit_details: true,
            can_manage_guests: true,
            can_view_analytics: true,
            can_manage_photos: true,
            can_edit_guest_book: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeddingAccess {
    pub id: String,
    pub wedding_id: String,
    pub user_id: String,
    pub access_level: String,
    /// JSON-encoded [`WeddingPermissions`]
    pub permissions: String,
    pub granted_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl WeddingAccess {
    pub fn level(&self) -> AccessLevel {
        AccessLevel::from(self.access_level.clone())
    }

    /// Decoded permissions. A corrupt value grants nothing.
    pub fn permissions(&self) -> WeddingPermissions {
        serde_json::from_str(&self.permissions).unwrap_or_default()
    }
}

/// Grant joined with the grantee's identity, for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeddingAccessResponse {
    pub id: String,
    pub wedding_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub access_level: String,
    pub permissions: WeddingPermissions,
    pub granted_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
struct WeddingAccessWithUser {
    id: String,
    wedding_id: String,
    user_id: String,
    user_email: String,
    user_name: String,
    access_level: String,
    permissions: String,
    granted_by: Option<String>,
    created_at: String,
}

impl From<WeddingAccessWithUser> for WeddingAccessResponse {
    fn from(row: WeddingAccessWithUser) -> Self {
        Self {
            permissions: serde_json::from_str(&row.permissions).unwrap_or_default(),
            id: row.id,
            wedding_id: row.wedding_id,
            user_id: row.user_id,
            user_email: row.user_email,
            user_name: row.user_name,
            access_level: row.access_level,
            granted_by: row.granted_by,
            created_at: row.created_at,
        }
    }
}

/// Grant request. The grantee is identified by id or email.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantAccessRequest {
    pub wedding_id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub access_level: AccessLevel,
    pub permissions: Option<WeddingPermissions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAccessRequest {
    pub access_level: Option<AccessLevel>,
    pub permissions: Option<WeddingPermissions>,
}

pub(crate) fn encode_permissions(permissions: &WeddingPermissions) -> String {
    serde_json::to_string(permissions).unwrap_or_else(|_| "{}".to_string())
}

pub async fn insert_access(
    pool: &SqlitePool,
    wedding_id: &str,
    user_id: &str,
    level: AccessLevel,
    permissions: &WeddingPermissions,
    granted_by: Option<&str>,
) -> Result<WeddingAccess, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO wedding_access (id, wedding_id, user_id, access_level, permissions, granted_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(wedding_id)
    .bind(user_id)
    .bind(level.to_string())
    .bind(encode_permissions(permissions))
    .bind(granted_by)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM wedding_access WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_access(pool: &SqlitePool, id: &str) -> Result<Option<WeddingAccess>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wedding_access WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Grant held by a user on a wedding, if any
pub async fn find_access(
    pool: &SqlitePool,
    wedding_id: &str,
    user_id: &str,
) -> Result<Option<WeddingAccess>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wedding_access WHERE wedding_id = ? AND user_id = ?")
        .bind(wedding_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_access_for_wedding(
    pool: &SqlitePool,
    wedding_id: &str,
) -> Result<Vec<WeddingAccessResponse>, sqlx::Error> {
    let rows: Vec<WeddingAccessWithUser> = sqlx::query_as(
        r#"
        SELECT wa.id, wa.wedding_id, wa.user_id, u.email AS user_email, u.name AS user_name,
               wa.access_level, wa.permissions, wa.granted_by, wa.created_at
        FROM wedding_access wa
        INNER JOIN users u ON u.id = wa.user_id
        WHERE wa.wedding_id = ?
        ORDER BY wa.created_at ASC
        "#,
    )
    .bind(wedding_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn update_access(
    pool: &SqlitePool,
    id: &str,
    level: AccessLevel,
    permissions: &WeddingPermissions,
) -> Result<Option<WeddingAccess>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE wedding_access SET access_level = ?, permissions = ?, updated_at = ? WHERE id = ?",
    )
    .bind(level.to_string())
    .bind(encode_permissions(permissions))
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_access(pool, id).await
}

pub async fn delete_access(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM wedding_access WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;
    use crate::db::test_support::{seed_user, seed_wedding};

    #[test]
    fn test_default_permissions_per_level() {
        assert_eq!(AccessLevel::Owner.default_permissions(), WeddingPermissions::all());
        assert_eq!(AccessLevel::Viewer.default_permissions(), WeddingPermissions::none());

        let gm = AccessLevel::GuestManager.default_permissions();
        assert!(gm.can_manage_guests);
        assert!(gm.can_view_analytics);
        assert!(!gm.can_edit_details);
        assert!(!gm.can_manage_photos);
        assert!(!gm.can_edit_guest_book);
    }

    #[test]
    fn test_partial_permissions_json_defaults_to_false() {
        let perms: WeddingPermissions =
            serde_json::from_str(r#"{"can_manage_photos": true}"#).unwrap();
        assert!(perms.can_manage_photos);
        assert!(!perms.can_edit_details);
    }

    #[tokio::test]
    async fn test_grant_is_unique_per_wedding_and_user() {
        let pool = init_memory().await.unwrap();
        let owner = seed_user(&pool, "owner@example.com").await;
        let helper = seed_user(&pool, "helper@example.com").await;
        let wedding = seed_wedding(&pool, &owner.id).await;

        let level = AccessLevel::GuestManager;
        insert_access(&pool, &wedding.id, &helper.id, level, &level.default_permissions(), Some(&owner.id))
            .await
            .unwrap();
        let dup = insert_access(&pool, &wedding.id, &helper.id, AccessLevel::Viewer, &WeddingPermissions::none(), None).await;
        assert!(dup.is_err());

        let listed = list_access_for_wedding(&pool, &wedding.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_email, "helper@example.com");
        assert!(listed[0].permissions.can_manage_guests);
    }

    #[tokio::test]
    async fn test_update_and_delete_grant() {
        let pool = init_memory().await.unwrap();
        let owner = seed_user(&pool, "owner@example.com").await;
        let helper = seed_user(&pool, "helper@example.com").await;
        let wedding = seed_wedding(&pool, &owner.id).await;

        let grant = insert_access(&pool, &wedding.id, &helper.id, AccessLevel::Viewer, &WeddingPermissions::none(), None)
            .await
            .unwrap();

        let perms = WeddingPermissions {
            can_manage_photos: true,
            ..WeddingPermissions::none()
        };
        let updated = update_access(&pool, &grant.id, AccessLevel::Viewer, &perms)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.permissions().can_manage_photos);

        assert!(delete_access(&pool, &grant.id).await.unwrap());
        assert!(find_access(&pool, &wedding.id, &helper.id).await.unwrap().is_none());
        assert!(!delete_access(&pool, &grant.id).await.unwrap());
    }
}
