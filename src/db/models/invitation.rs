//! Invitation bookkeeping. Records how and when a guest was invited; nothing
//! here delivers messages.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvitationChannel {
    Email,
    Sms,
    #[default]
    Link,
}

impl std::fmt::Display for InvitationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationChannel::Email => write!(f, "email"),
            InvitationChannel::Sms => write!(f, "sms"),
            InvitationChannel::Link => write!(f, "link"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Failed,
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Sent => write!(f, "sent"),
            InvitationStatus::Delivered => write!(f, "delivered"),
            InvitationStatus::Opened => write!(f, "opened"),
            InvitationStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: String,
    pub wedding_id: String,
    pub guest_id: String,
    pub channel: String,
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: Option<String>,
    pub reminder_count: i64,
    pub last_reminder_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitationRequest {
    pub guest_id: String,
    #[serde(default)]
    pub channel: InvitationChannel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInvitationStatusRequest {
    pub status: InvitationStatus,
    pub error_message: Option<String>,
}

pub async fn insert_invitation(
    pool: &SqlitePool,
    wedding_id: &str,
    guest_id: &str,
    channel: InvitationChannel,
) -> Result<Invitation, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO invitations (id, wedding_id, guest_id, channel, status, reminder_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'pending', 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(wedding_id)
    .bind(guest_id)
    .bind(channel.to_string())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM invitations WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_invitation(pool: &SqlitePool, id: &str) -> Result<Option<Invitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invitations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_invitations(pool: &SqlitePool, wedding_id: &str) -> Result<Vec<Invitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invitations WHERE wedding_id = ? ORDER BY created_at DESC, rowid DESC")
        .bind(wedding_id)
        .fetch_all(pool)
        .await
}

pub async fn list_invitations_for_guest(pool: &SqlitePool, guest_id: &str) -> Result<Vec<Invitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invitations WHERE guest_id = ? ORDER BY created_at DESC, rowid DESC")
        .bind(guest_id)
        .fetch_all(pool)
        .await
}

/// Record a delivery status. The first move to `sent` stamps `sent_at`.
pub async fn update_invitation_status(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateInvitationStatusRequest,
) -> Result<Option<Invitation>, sqlx::Error> {
    let now = now_rfc3339();
    let sent_at = matches!(req.status, InvitationStatus::Sent).then(|| now.clone());
    let error_message = match req.status {
        InvitationStatus::Failed => req.error_message.clone(),
        _ => None,
    };

    let result = sqlx::query(
        r#"
        UPDATE invitations SET
            status = ?,
            error_message = ?,
            sent_at = COALESCE(sent_at, ?),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.status.to_string())
    .bind(&error_message)
    .bind(&sent_at)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_invitation(pool, id).await
}

pub async fn record_reminder(pool: &SqlitePool, id: &str) -> Result<Option<Invitation>, sqlx::Error> {
    let now = now_rfc3339();

    let result = sqlx::query(
        "UPDATE invitations SET reminder_count = reminder_count + 1, last_reminder_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_invitation(pool, id).await
}
