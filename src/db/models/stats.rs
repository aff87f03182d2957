//! Platform-wide counters for the admin dashboard.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformStats {
    pub total_users: i64,
    pub paid_users: i64,
    pub guest_managers: i64,
    pub total_weddings: i64,
    pub public_weddings: i64,
    pub total_guests: i64,
    pub confirmed_guests: i64,
    pub total_photos: i64,
    pub guest_book_entries: i64,
}

pub async fn platform_stats(pool: &SqlitePool) -> Result<PlatformStats, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE has_paid_subscription = 1) AS paid_users,
            (SELECT COUNT(*) FROM users WHERE role = 'guest_manager') AS guest_managers,
            (SELECT COUNT(*) FROM weddings) AS total_weddings,
            (SELECT COUNT(*) FROM weddings WHERE is_public = 1) AS public_weddings,
            (SELECT COUNT(*) FROM guests) AS total_guests,
            (SELECT COUNT(*) FROM guests WHERE rsvp_status = 'confirmed') AS confirmed_guests,
            (SELECT COUNT(*) FROM photos) AS total_photos,
            (SELECT COUNT(*) FROM guest_book_entries) AS guest_book_entries
        "#,
    )
    .fetch_one(pool)
    .await
}
