use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: String,
    pub wedding_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: String,
    pub celebration_message: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMilestoneRequest {
    pub wedding_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: String,
    pub celebration_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMilestoneRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub celebration_message: Option<String>,
    pub is_completed: Option<bool>,
}

pub async fn insert_milestone(
    pool: &SqlitePool,
    req: &CreateMilestoneRequest,
) -> Result<Milestone, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO milestones (id, wedding_id, title, description, target_date, celebration_message, is_completed, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.wedding_id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&req.target_date)
    .bind(&req.celebration_message)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM milestones WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_milestone(pool: &SqlitePool, id: &str) -> Result<Option<Milestone>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM milestones WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Milestones for a wedding in countdown order
pub async fn list_milestones(pool: &SqlitePool, wedding_id: &str) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM milestones WHERE wedding_id = ? ORDER BY target_date ASC, created_at ASC")
        .bind(wedding_id)
        .fetch_all(pool)
        .await
}

/// Apply a partial update. Toggling completion stamps or clears `completed_at`.
pub async fn update_milestone(
    pool: &SqlitePool,
    milestone: &Milestone,
    req: &UpdateMilestoneRequest,
) -> Result<Milestone, sqlx::Error> {
    let (is_completed, completed_at) = match req.is_completed {
        Some(true) if !milestone.is_completed => (true, Some(now_rfc3339())),
        Some(true) => (true, milestone.completed_at.clone()),
        Some(false) => (false, None),
        None => (milestone.is_completed, milestone.completed_at.clone()),
    };

    sqlx::query(
        r#"
        UPDATE milestones SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            target_date = COALESCE(?, target_date),
            celebration_message = COALESCE(?, celebration_message),
            is_completed = ?,
            completed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(&req.target_date)
    .bind(&req.celebration_message)
    .bind(is_completed)
    .bind(&completed_at)
    .bind(&milestone.id)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM milestones WHERE id = ?")
        .bind(&milestone.id)
        .fetch_one(pool)
        .await
}

/// Mark a milestone reached
pub async fn complete_milestone(
    pool: &SqlitePool,
    milestone: &Milestone,
) -> Result<Milestone, sqlx::Error> {
    let req = UpdateMilestoneRequest {
        is_completed: Some(true),
        ..Default::default()
    };
    update_milestone(pool, milestone, &req).await
}

pub async fn delete_milestone(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM milestones WHERE id = ?")
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

    fn milestone(wedding_id: &str, title: &str, target_date: &str) -> CreateMilestoneRequest {
        CreateMilestoneRequest {
            wedding_id: wedding_id.to_string(),
            title: title.to_string(),
            description: None,
            target_date: target_date.to_string(),
            celebration_message: None,
        }
    }

    #[tokio::test]
    async fn test_milestones_ordered_by_target_date() {
        let pool = init_memory().await.unwrap();
        let owner = seed_user(&pool, "owner@example.com").await;
        let wedding = seed_wedding(&pool, &owner.id).await;

        insert_milestone(&pool, &milestone(&wedding.id, "Send invitations", "2026-05-01")).await.unwrap();
        insert_milestone(&pool, &milestone(&wedding.id, "Book venue", "2026-01-15")).await.unwrap();

        let list = list_milestones(&pool, &wedding.id).await.unwrap();
        assert_eq!(list[0].title, "Book venue");
        assert_eq!(list[1].title, "Send invitations");
    }

    #[tokio::test]
    async fn test_complete_and_reopen() {
        let pool = init_memory().await.unwrap();
        let owner = seed_user(&pool, "owner@example.com").await;
        let wedding = seed_wedding(&pool, &owner.id).await;
        let m = insert_milestone(&pool, &milestone(&wedding.id, "Dress fitting", "2026-04-01"))
            .await
            .unwrap();
        assert!(!m.is_completed);

        let done = complete_milestone(&pool, &m).await.unwrap();
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());

        // Completing again keeps the original timestamp
        let again = complete_milestone(&pool, &done).await.unwrap();
        assert_eq!(again.completed_at, done.completed_at);

        let reopen = UpdateMilestoneRequest {
            is_completed: Some(false),
            ..Default::default()
        };
        let reopened = update_milestone(&pool, &again, &reopen).await.unwrap();
        assert!(!reopened.is_completed);
        assert!(reopened.completed_at.is_none());
    }
}
