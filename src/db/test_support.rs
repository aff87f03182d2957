//! Fixtures shared by the database and API tests.

use sqlx::SqlitePool;

use super::{generate_slug, insert_user, insert_wedding, CreateWeddingRequest, User, UserRole, Wedding};

pub async fn seed_user(pool: &SqlitePool, email: &str) -> User {
    insert_user(pool, email, "not-a-real-hash", "Test User", UserRole::User)
        .await
        .unwrap()
}

pub async fn seed_user_with_role(pool: &SqlitePool, email: &str, role: UserRole) -> User {
    insert_user(pool, email, "not-a-real-hash", "Test User", role)
        .await
        .unwrap()
}

pub fn wedding_request() -> CreateWeddingRequest {
    serde_json::from_value(serde_json::json!({
        "bride": "Madina",
        "groom": "Sardor",
        "wedding_date": "2026-06-20",
    }))
    .unwrap()
}

pub async fn seed_wedding(pool: &SqlitePool, owner_id: &str) -> Wedding {
    insert_wedding(pool, owner_id, &generate_slug(), &wedding_request())
        .await
        .unwrap()
}

pub async fn seed_private_wedding(pool: &SqlitePool, owner_id: &str) -> Wedding {
    let mut req = wedding_request();
    req.is_public = false;
    insert_wedding(pool, owner_id, &generate_slug(), &req)
        .await
        .unwrap()
}
