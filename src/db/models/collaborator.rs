//! Collaborator invitations.
//!
//! The couple invites a helper by email before that person necessarily has
//! an account. The invitation stays pending until the invitee signs in and
//! accepts it, which turns it into a regular `wedding_access` grant.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::access::encode_permissions;
use crate::db::{get_access, now_rfc3339, AccessLevel, WeddingAccess, WeddingPermissions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorStatus {
    Pending,
    Accepted,
    Declined,
    Revoked,
}

impl CollaboratorStatus {
    /// Whether a status change is allowed. Acceptance is not a plain status
    /// change and is rejected here.
    pub fn can_become(self, next: CollaboratorStatus) -> bool {
        use CollaboratorStatus::*;
        matches!(
            (self, next),
            (Pending, Declined)
                | (Pending, Revoked)
                | (Accepted, Revoked)
                | (Declined, Pending)
                | (Revoked, Pending)
        )
    }
}

impl std::fmt::Display for CollaboratorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollaboratorStatus::Pending => write!(f, "pending"),
            CollaboratorStatus::Accepted => write!(f, "accepted"),
            CollaboratorStatus::Declined => write!(f, "declined"),
            CollaboratorStatus::Revoked => write!(f, "revoked"),
        }
    }
}

impl std::str::FromStr for CollaboratorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CollaboratorStatus::Pending),
            "accepted" => Ok(CollaboratorStatus::Accepted),
            "declined" => Ok(CollaboratorStatus::Declined),
            "revoked" => Ok(CollaboratorStatus::Revoked),
            _ => Err(format!("Unknown collaborator status: {}", s)),
        }
    }
}

impl From<String> for CollaboratorStatus {
    fn from(s: String) -> Self {
        // Unknown values are treated as revoked so they never grant anything
        s.parse().unwrap_or(CollaboratorStatus::Revoked)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Collaborator {
    pub id: String,
    pub wedding_id: String,
    pub email: String,
    pub name: Option<String>,
    pub access_level: String,
    /// JSON-encoded [`WeddingPermissions`]
    pub permissions: String,
    pub status: String,
    pub invited_by: Option<String>,
    /// Account that accepted the invitation
    pub user_id: Option<String>,
    pub accepted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Collaborator {
    pub fn level(&self) -> AccessLevel {
        AccessLevel::from(self.access_level.clone())
    }

    pub fn permissions(&self) -> WeddingPermissions {
        serde_json::from_str(&self.permissions).unwrap_or_default()
    }

    pub fn status(&self) -> CollaboratorStatus {
        CollaboratorStatus::from(self.status.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollaboratorResponse {
    pub id: String,
    pub wedding_id: String,
    pub email: String,
    pub name: Option<String>,
    pub access_level: String,
    pub permissions: WeddingPermissions,
    pub status: String,
    pub invited_by: Option<String>,
    pub user_id: Option<String>,
    pub accepted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Collaborator> for CollaboratorResponse {
    fn from(c: Collaborator) -> Self {
        Self {
            permissions: c.permissions(),
            id: c.id,
            wedding_id: c.wedding_id,
            email: c.email,
            name: c.name,
            access_level: c.access_level,
            status: c.status,
            invited_by: c.invited_by,
            user_id: c.user_id,
            accepted_at: c.accepted_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollaboratorRequest {
    pub wedding_id: String,
    pub email: String,
    pub name: Option<String>,
    pub access_level: AccessLevel,
    pub permissions: Option<WeddingPermissions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCollaboratorStatusRequest {
    pub status: CollaboratorStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptCollaboratorRequest {
    pub wedding_id: String,
}

pub async fn insert_collaborator(
    pool: &SqlitePool,
    req: &CreateCollaboratorRequest,
    permissions: &WeddingPermissions,
    invited_by: &str,
) -> Result<Collaborator, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO collaborators (id, wedding_id, email, name, access_level, permissions, status, invited_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.wedding_id)
    .bind(req.email.trim())
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.access_level.to_string())
    .bind(encode_permissions(permissions))
    .bind(invited_by)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM collaborators WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_collaborator(pool: &SqlitePool, id: &str) -> Result<Option<Collaborator>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM collaborators WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_collaborators(pool: &SqlitePool, wedding_id: &str) -> Result<Vec<Collaborator>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM collaborators WHERE wedding_id = ? ORDER BY created_at ASC, rowid ASC")
        .bind(wedding_id)
        .fetch_all(pool)
        .await
}

/// Pending invitation for an email address on a wedding
pub async fn find_pending_collaborator(
    pool: &SqlitePool,
    wedding_id: &str,
    email: &str,
) -> Result<Option<Collaborator>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM collaborators WHERE wedding_id = ? AND email = ? AND status = 'pending'")
        .bind(wedding_id)
        .bind(email.trim())
        .fetch_optional(pool)
        .await
}

pub async fn update_collaborator_status(
    pool: &SqlitePool,
    id: &str,
    status: CollaboratorStatus,
) -> Result<Option<Collaborator>, sqlx::Error> {
    let result = sqlx::query("UPDATE collaborators SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_collaborator(pool, id).await
}

/// Turn a pending invitation into a grant for `user_id`. Both rows are
/// written in one transaction. Fails with a UNIQUE violation when the user
/// already holds a grant on the wedding.
pub async fn accept_collaborator(
    pool: &SqlitePool,
    collaborator: &Collaborator,
    user_id: &str,
) -> Result<(Collaborator, WeddingAccess), sqlx::Error> {
    let grant_id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO wedding_access (id, wedding_id, user_id, access_level, permissions, granted_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&grant_id)
    .bind(&collaborator.wedding_id)
    .bind(user_id)
    .bind(&collaborator.access_level)
    .bind(&collaborator.permissions)
    .bind(&collaborator.invited_by)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query(
        r#"
        UPDATE collaborators SET status = 'accepted', user_id = ?, accepted_at = ?, updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(user_id)
    .bind(&now)
    .bind(&now)
    .bind(&collaborator.id)
    .execute(&mut *tx)
    .await?;

    // Dropping the transaction rolls the grant back
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    tx.commit().await?;

    let accepted = get_collaborator(pool, &collaborator.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let grant = get_access(pool, &grant_id).await?.ok_or(sqlx::Error::RowNotFound)?;
    Ok((accepted, grant))
}
