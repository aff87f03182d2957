//! Guest list and RSVP tracking.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

/// RSVP state of a guest.
///
/// Every state may move to any other. Leaving `Pending` stamps the response
/// time; moving back to `Pending` clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    #[default]
    Pending,
    Confirmed,
    Declined,
    Maybe,
}

impl RsvpStatus {
    /// Response timestamp to store after moving to this status
    pub fn responded_at(self, now: &str) -> Option<String> {
        match self {
            RsvpStatus::Pending => None,
            _ => Some(now.to_string()),
        }
    }

    /// Whether a guest may submit this status themselves
    pub fn is_guest_submittable(self) -> bool {
        !matches!(self, RsvpStatus::Pending)
    }
}

impl std::fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RsvpStatus::Pending => write!(f, "pending"),
            RsvpStatus::Confirmed => write!(f, "confirmed"),
            RsvpStatus::Declined => write!(f, "declined"),
            RsvpStatus::Maybe => write!(f, "maybe"),
        }
    }
}

impl std::str::FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RsvpStatus::Pending),
            "confirmed" => Ok(RsvpStatus::Confirmed),
            "declined" => Ok(RsvpStatus::Declined),
            "maybe" => Ok(RsvpStatus::Maybe),
            _ => Err(format!("Unknown RSVP status: {}", s)),
        }
    }
}

impl From<String> for RsvpStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Which side of the couple a guest belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestSide {
    Bride,
    Groom,
    Both,
}

impl std::fmt::Display for GuestSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuestSide::Bride => write!(f, "bride"),
            GuestSide::Groom => write!(f, "groom"),
            GuestSide::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for GuestSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bride" => Ok(GuestSide::Bride),
            "groom" => Ok(GuestSide::Groom),
            "both" => Ok(GuestSide::Both),
            _ => Err(format!("Unknown guest side: {}", s)),
        }
    }
}

/// Valid guest categories
pub const GUEST_CATEGORIES: [&str; 4] = ["family", "friends", "colleagues", "other"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guest {
    pub id: String,
    pub wedding_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rsvp_status: String,
    pub category: String,
    pub side: String,
    pub plus_one: bool,
    pub plus_one_name: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub message: Option<String>,
    pub table_number: Option<i64>,
    pub notes: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Guest {
    pub fn rsvp_enum(&self) -> RsvpStatus {
        RsvpStatus::from(self.rsvp_status.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGuestRequest {
    pub wedding_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub rsvp_status: RsvpStatus,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_side")]
    pub side: GuestSide,
    #[serde(default)]
    pub plus_one: bool,
    pub plus_one_name: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub table_number: Option<i64>,
    pub notes: Option<String>,
}

fn default_category() -> String {
    "family".to_string()
}

fn default_side() -> GuestSide {
    GuestSide::Both
}

/// Administrative edit of a guest record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGuestRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rsvp_status: Option<RsvpStatus>,
    pub category: Option<String>,
    pub side: Option<GuestSide>,
    pub plus_one: Option<bool>,
    pub plus_one_name: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub table_number: Option<i64>,
    pub notes: Option<String>,
}

/// Guest-facing RSVP submission
#[derive(Debug, Clone, Deserialize)]
pub struct RsvpUpdateRequest {
    pub rsvp_status: RsvpStatus,
    pub message: Option<String>,
    pub plus_one: Option<bool>,
    pub plus_one_name: Option<String>,
    pub dietary_restrictions: Option<String>,
}

pub async fn insert_guest(pool: &SqlitePool, req: &CreateGuestRequest) -> Result<Guest, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();
    let responded_at = req.rsvp_status.responded_at(&now);

    sqlx::query(
        r#"
        INSERT INTO guests (
            id, wedding_id, name, email, phone, rsvp_status, category, side,
            plus_one, plus_one_name, dietary_restrictions, table_number, notes,
            responded_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.wedding_id)
    .bind(req.name.trim())
    .bind(&req.email)
    .bind(&req.phone)
    .bind(req.rsvp_status.to_string())
    .bind(&req.category)
    .bind(req.side.to_string())
    .bind(req.plus_one)
    .bind(&req.plus_one_name)
    .bind(&req.dietary_restrictions)
    .bind(req.table_number)
    .bind(&req.notes)
    .bind(&responded_at)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM guests WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_guest(pool: &SqlitePool, id: &str) -> Result<Option<Guest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM guests WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_guests(pool: &SqlitePool, wedding_id: &str) -> Result<Vec<Guest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM guests WHERE wedding_id = ? ORDER BY created_at ASC, name ASC")
        .bind(wedding_id)
        .fetch_all(pool)
        .await
}

/// Apply an administrative edit. The response timestamp only moves when the
/// RSVP status is part of the edit.
pub async fn update_guest(
    pool: &SqlitePool,
    guest: &Guest,
    req: &UpdateGuestRequest,
) -> Result<Guest, sqlx::Error> {
    let now = now_rfc3339();
    // Without a status in the request the stored RSVP is left untouched, so a
    // response recorded after `guest` was loaded survives this edit
    let rsvp_status = req.rsvp_status.map(|status| status.to_string());
    let responded_at = req.rsvp_status.and_then(|status| status.responded_at(&now));

    sqlx::query(
        r#"
        UPDATE guests SET
            name = COALESCE(?, name),
            email = COALESCE(?, email),
            phone = COALESCE(?, phone),
            rsvp_status = COALESCE(?, rsvp_status),
            category = COALESCE(?, category),
            side = COALESCE(?, side),
            plus_one = COALESCE(?, plus_one),
            plus_one_name = COALESCE(?, plus_one_name),
            dietary_restrictions = COALESCE(?, dietary_restrictions),
            table_number = COALESCE(?, table_number),
            notes = COALESCE(?, notes),
            responded_at = CASE WHEN ? IS NULL THEN responded_at ELSE ? END,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&rsvp_status)
    .bind(&req.category)
    .bind(req.side.map(|s| s.to_string()))
    .bind(req.plus_one)
    .bind(&req.plus_one_name)
    .bind(&req.dietary_restrictions)
    .bind(req.table_number)
    .bind(&req.notes)
    .bind(&rsvp_status)
    .bind(&responded_at)
    .bind(&now)
    .bind(&guest.id)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM guests WHERE id = ?")
        .bind(&guest.id)
        .fetch_one(pool)
        .await
}

/// Record an RSVP submission. Re-submission overwrites status and timestamp.
pub async fn record_rsvp(
    pool: &SqlitePool,
    guest_id: &str,
    req: &RsvpUpdateRequest,
) -> Result<Option<Guest>, sqlx::Error> {
    let now = now_rfc3339();
    let responded_at = req.rsvp_status.responded_at(&now);

    let result = sqlx::query(
        r#"
        UPDATE guests SET
            rsvp_status = ?,
            message = COALESCE(?, message),
            plus_one = COALESCE(?, plus_one),
            plus_one_name = COALESCE(?, plus_one_name),
            dietary_restrictions = COALESCE(?, dietary_restrictions),
            responded_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.rsvp_status.to_string())
    .bind(&req.message)
    .bind(req.plus_one)
    .bind(&req.plus_one_name)
    .bind(&req.dietary_restrictions)
    .bind(&responded_at)
    .bind(&now)
    .bind(guest_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_guest(pool, guest_id).await
}

pub async fn delete_guest(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM guests WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
