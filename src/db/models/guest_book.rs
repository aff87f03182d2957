use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GuestBookEntry {
    pub id: String,
    pub wedding_id: String,
    pub guest_name: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGuestBookEntryRequest {
    pub wedding_id: String,
    pub guest_name: String,
    pub message: String,
}

pub async fn insert_guest_book_entry(
    pool: &SqlitePool,
    req: &CreateGuestBookEntryRequest,
) -> Result<GuestBookEntry, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO guest_book_entries (id, wedding_id, guest_name, message, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.wedding_id)
    .bind(req.guest_name.trim())
    .bind(req.message.trim())
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM guest_book_entries WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_guest_book_entry(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<GuestBookEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM guest_book_entries WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Entries for a wedding, newest first
pub async fn list_guest_book_entries(
    pool: &SqlitePool,
    wedding_id: &str,
) -> Result<Vec<GuestBookEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM guest_book_entries WHERE wedding_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(wedding_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_guest_book_entry(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM guest_book_entries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
