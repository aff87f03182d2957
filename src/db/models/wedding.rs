//! Wedding directory: wedding records keyed by their public URL slug.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

/// Alphabet used for generated public slugs
const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated public slugs
pub const SLUG_LENGTH: usize = 12;

/// Languages a wedding site can be offered in
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "uz", "ru"];

/// Generate a random public slug for a new wedding.
///
/// Uniqueness is left to the `UNIQUE` constraint on `weddings.unique_url`.
pub fn generate_slug() -> String {
    let mut rng = rand::rng();
    (0..SLUG_LENGTH)
        .map(|_| SLUG_ALPHABET[rng.random_range(0..SLUG_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wedding {
    pub id: String,
    pub user_id: String,
    pub unique_url: String,
    pub bride: String,
    pub groom: String,
    pub wedding_date: String,
    pub wedding_time: Option<String>,
    pub venue: String,
    pub venue_address: String,
    pub story: String,
    pub template: String,
    pub primary_color: String,
    pub accent_color: String,
    pub background_music_url: Option<String>,
    pub is_public: bool,
    pub default_language: String,
    /// JSON array of language codes
    pub available_languages: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Wedding {
    pub fn languages(&self) -> Vec<String> {
        parse_languages(&self.available_languages)
    }
}

/// Parse the stored language list, falling back to English
pub fn parse_languages(json: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(json)
        .ok()
        .filter(|langs| !langs.is_empty())
        .unwrap_or_else(|| vec!["en".to_string()])
}

/// Wedding as returned by the API, with the language list decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeddingResponse {
    pub id: String,
    pub user_id: String,
    pub unique_url: String,
    pub bride: String,
    pub groom: String,
    pub wedding_date: String,
    pub wedding_time: Option<String>,
    pub venue: String,
    pub venue_address: String,
    pub story: String,
    pub template: String,
    pub primary_color: String,
    pub accent_color: String,
    pub background_music_url: Option<String>,
    pub is_public: bool,
    pub default_language: String,
    pub available_languages: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Wedding> for WeddingResponse {
    fn from(w: Wedding) -> Self {
        let available_languages = w.languages();
        Self {
            id: w.id,
            user_id: w.user_id,
            unique_url: w.unique_url,
            bride: w.bride,
            groom: w.groom,
            wedding_date: w.wedding_date,
            wedding_time: w.wedding_time,
            venue: w.venue,
            venue_address: w.venue_address,
            story: w.story,
            template: w.template,
            primary_color: w.primary_color,
            accent_color: w.accent_color,
            background_music_url: w.background_music_url,
            is_public: w.is_public,
            default_language: w.default_language,
            available_languages,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWeddingRequest {
    pub bride: String,
    pub groom: String,
    pub wedding_date: String,
    pub wedding_time: Option<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub venue_address: String,
    #[serde(default)]
    pub story: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    pub background_music_url: Option<String>,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    /// Owner to create the wedding for (admins only)
    pub user_id: Option<String>,
}

fn default_template() -> String {
    "gardenRomance".to_string()
}

fn default_primary_color() -> String {
    "#D4B08C".to_string()
}

fn default_accent_color() -> String {
    "#89916B".to_string()
}

fn default_is_public() -> bool {
    true
}

/// Partial update of a wedding. The public slug is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWeddingRequest {
    pub bride: Option<String>,
    pub groom: Option<String>,
    pub wedding_date: Option<String>,
    pub wedding_time: Option<String>,
    pub venue: Option<String>,
    pub venue_address: Option<String>,
    pub story: Option<String>,
    pub template: Option<String>,
    pub primary_color: Option<String>,
    pub accent_color: Option<String>,
    pub background_music_url: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeddingLanguages {
    pub default_language: String,
    pub available_languages: Vec<String>,
}

impl From<&Wedding> for WeddingLanguages {
    fn from(w: &Wedding) -> Self {
        Self {
            default_language: w.default_language.clone(),
            available_languages: w.languages(),
        }
    }
}

/// Per-wedding dashboard counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct WeddingStats {
    pub total_guests: i64,
    pub confirmed_guests: i64,
    pub pending_guests: i64,
    pub declined_guests: i64,
    pub maybe_guests: i64,
    pub plus_ones: i64,
    pub total_photos: i64,
    pub guest_book_entries: i64,
}

pub async fn insert_wedding(
    pool: &SqlitePool,
    owner_id: &str,
    slug: &str,
    req: &CreateWeddingRequest,
) -> Result<Wedding, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO weddings (
            id, user_id, unique_url, bride, groom, wedding_date, wedding_time,
            venue, venue_address, story, template, primary_color, accent_color,
            background_music_url, is_public, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(slug)
    .bind(req.bride.trim())
    .bind(req.groom.trim())
    .bind(&req.wedding_date)
    .bind(&req.wedding_time)
    .bind(req.venue.trim())
    .bind(req.venue_address.trim())
    .bind(req.story.trim())
    .bind(&req.template)
    .bind(&req.primary_color)
    .bind(&req.accent_color)
    .bind(&req.background_music_url)
    .bind(req.is_public)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM weddings WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_wedding(pool: &SqlitePool, id: &str) -> Result<Option<Wedding>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM weddings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_wedding_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Wedding>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM weddings WHERE unique_url = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// Weddings a user owns or holds an access grant on
pub async fn list_weddings_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Wedding>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT DISTINCT w.* FROM weddings w
        LEFT JOIN wedding_access wa ON wa.wedding_id = w.id AND wa.user_id = ?
        WHERE w.user_id = ? OR wa.id IS NOT NULL
        ORDER BY w.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all_weddings(pool: &SqlitePool) -> Result<Vec<Wedding>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM weddings ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn update_wedding(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateWeddingRequest,
) -> Result<Option<Wedding>, sqlx::Error> {
    let now = now_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE weddings SET
            bride = COALESCE(?, bride),
            groom = COALESCE(?, groom),
            wedding_date = COALESCE(?, wedding_date),
            wedding_time = COALESCE(?, wedding_time),
            venue = COALESCE(?, venue),
            venue_address = COALESCE(?, venue_address),
            story = COALESCE(?, story),
            template = COALESCE(?, template),
            primary_color = COALESCE(?, primary_color),
            accent_color = COALESCE(?, accent_color),
            background_music_url = COALESCE(?, background_music_url),
            is_public = COALESCE(?, is_public),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.bride.as_deref().map(str::trim))
    .bind(req.groom.as_deref().map(str::trim))
    .bind(&req.wedding_date)
    .bind(&req.wedding_time)
    .bind(req.venue.as_deref().map(str::trim))
    .bind(req.venue_address.as_deref().map(str::trim))
    .bind(&req.story)
    .bind(&req.template)
    .bind(&req.primary_color)
    .bind(&req.accent_color)
    .bind(&req.background_music_url)
    .bind(req.is_public)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_wedding(pool, id).await
}

pub async fn update_languages(
    pool: &SqlitePool,
    id: &str,
    languages: &WeddingLanguages,
) -> Result<Option<Wedding>, sqlx::Error> {
    let available = serde_json::to_string(&languages.available_languages)
        .unwrap_or_else(|_| "[\"en\"]".to_string());

    let result = sqlx::query(
        "UPDATE weddings SET default_language = ?, available_languages = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&languages.default_language)
    .bind(&available)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_wedding(pool, id).await
}

/// Delete a wedding. Child records are removed by `ON DELETE CASCADE`.
pub async fn delete_wedding(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM weddings WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn wedding_stats(pool: &SqlitePool, wedding_id: &str) -> Result<WeddingStats, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM guests WHERE wedding_id = ?1) AS total_guests,
            (SELECT COUNT(*) FROM guests WHERE wedding_id = ?1 AND rsvp_status = 'confirmed') AS confirmed_guests,
            (SELECT COUNT(*) FROM guests WHERE wedding_id = ?1 AND rsvp_status = 'pending') AS pending_guests,
            (SELECT COUNT(*) FROM guests WHERE wedding_id = ?1 AND rsvp_status = 'declined') AS declined_guests,
            (SELECT COUNT(*) FROM guests WHERE wedding_id = ?1 AND rsvp_status = 'maybe') AS maybe_guests,
            (SELECT COUNT(*) FROM guests WHERE wedding_id = ?1 AND plus_one = 1) AS plus_ones,
            (SELECT COUNT(*) FROM photos WHERE wedding_id = ?1) AS total_photos,
            (SELECT COUNT(*) FROM guest_book_entries WHERE wedding_id = ?1) AS guest_book_entries
        "#,
    )
    .bind(wedding_id)
    .fetch_one(pool)
    .await
}
