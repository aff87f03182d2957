mod models;
#[cfg(test)]
pub(crate) mod test_support;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("wedsite.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a fresh in-memory database with all migrations applied.
///
/// The pool is capped at a single connection since every SQLite
/// in-memory connection is its own database.
pub async fn init_memory() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: users, sessions, weddings and their child tables
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: per-wedding access grants
    if !table_exists(pool, "wedding_access").await? {
        execute_sql(pool, include_str!("../../migrations/002_wedding_access.sql")).await?;
    }

    // Migration 003: budget planner and milestones
    if !table_exists(pool, "budget_categories").await? {
        execute_sql(pool, include_str!("../../migrations/003_planning.sql")).await?;
    }

    // Migration 004: invitation tracking
    if !table_exists(pool, "invitations").await? {
        execute_sql(pool, include_str!("../../migrations/004_invitations.sql")).await?;
    }

    // Migration 005: audit trail
    if !table_exists(pool, "audit_logs").await? {
        execute_sql(pool, include_str!("../../migrations/005_audit_logs.sql")).await?;
    }

    // Migration 006: collaborator invitations
    if !table_exists(pool, "collaborators").await? {
        execute_sql(pool, include_str!("../../migrations/006_collaborators.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

/// Current time formatted the way every timestamp column is stored
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
