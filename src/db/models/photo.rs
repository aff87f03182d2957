use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: String,
    pub wedding_id: String,
    pub url: String,
    pub caption: Option<String>,
    pub is_hero: bool,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePhotoRequest {
    pub wedding_id: String,
    pub url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub is_hero: bool,
}

/// Add a photo. Marking it as hero demotes any previous hero photo.
pub async fn insert_photo(pool: &SqlitePool, req: &CreatePhotoRequest) -> Result<Photo, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();

    if req.is_hero {
        sqlx::query("UPDATE photos SET is_hero = 0 WHERE wedding_id = ?")
            .bind(&req.wedding_id)
            .execute(pool)
            .await?;
    }

    sqlx::query(
        "INSERT INTO photos (id, wedding_id, url, caption, is_hero, uploaded_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.wedding_id)
    .bind(req.url.trim())
    .bind(&req.caption)
    .bind(req.is_hero)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM photos WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_photo(pool: &SqlitePool, id: &str) -> Result<Option<Photo>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM photos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Photos for a wedding, hero first then upload order
pub async fn list_photos(pool: &SqlitePool, wedding_id: &str) -> Result<Vec<Photo>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM photos WHERE wedding_id = ? ORDER BY is_hero DESC, uploaded_at ASC, rowid ASC",
    )
    .bind(wedding_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_photo(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM photos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
