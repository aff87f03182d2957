//! Budget planner: spending categories, line items and the rolled-up summary.
//!
//! All amounts are integer minor currency units.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::now_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for BudgetPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetPriority::Low => write!(f, "low"),
            BudgetPriority::Medium => write!(f, "medium"),
            BudgetPriority::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BudgetCategory {
    pub id: String,
    pub wedding_id: String,
    pub name: String,
    pub estimated_cost: i64,
    pub actual_cost: i64,
    pub is_paid: bool,
    pub priority: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBudgetCategoryRequest {
    pub wedding_id: String,
    pub name: String,
    #[serde(default)]
    pub estimated_cost: i64,
    #[serde(default)]
    pub actual_cost: i64,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub priority: BudgetPriority,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBudgetCategoryRequest {
    pub name: Option<String>,
    pub estimated_cost: Option<i64>,
    pub actual_cost: Option<i64>,
    pub is_paid: Option<bool>,
    pub priority: Option<BudgetPriority>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BudgetItem {
    pub id: String,
    pub wedding_id: String,
    pub category_id: String,
    pub name: String,
    pub vendor: Option<String>,
    pub estimated_cost: i64,
    pub actual_cost: i64,
    pub is_paid: bool,
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBudgetItemRequest {
    pub category_id: String,
    pub name: String,
    pub vendor: Option<String>,
    #[serde(default)]
    pub estimated_cost: i64,
    #[serde(default)]
    pub actual_cost: i64,
    #[serde(default)]
    pub is_paid: bool,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBudgetItemRequest {
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub estimated_cost: Option<i64>,
    pub actual_cost: Option<i64>,
    pub is_paid: Option<bool>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}

fn saturating_total(costs: impl Iterator<Item = i64>) -> i64 {
    costs.fold(0, |acc, cost| acc.saturating_add(cost))
}

/// Totals across every category of a wedding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_estimated: i64,
    pub total_actual: i64,
    /// Actual cost of categories marked paid
    pub total_paid: i64,
    /// Actual spend as a percentage of the estimate, 0 when nothing is estimated
    pub progress_percent: f64,
    pub over_budget_by: i64,
    pub category_count: usize,
}

impl BudgetSummary {
    pub fn from_categories(categories: &[BudgetCategory]) -> Self {
        let total_estimated = saturating_total(categories.iter().map(|c| c.estimated_cost));
        let total_actual = saturating_total(categories.iter().map(|c| c.actual_cost));
        let total_paid = saturating_total(
            categories
                .iter()
                .filter(|c| c.is_paid)
                .map(|c| c.actual_cost),
        );
        let progress_percent = if total_estimated > 0 {
            total_actual as f64 / total_estimated as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_estimated,
            total_actual,
            total_paid,
            progress_percent,
            over_budget_by: total_actual.saturating_sub(total_estimated).max(0),
            category_count: categories.len(),
        }
    }
}

pub async fn insert_budget_category(
    pool: &SqlitePool,
    req: &CreateBudgetCategoryRequest,
) -> Result<BudgetCategory, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO budget_categories (id, wedding_id, name, estimated_cost, actual_cost, is_paid, priority, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.wedding_id)
    .bind(req.name.trim())
    .bind(req.estimated_cost)
    .bind(req.actual_cost)
    .bind(req.is_paid)
    .bind(req.priority.to_string())
    .bind(&req.notes)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM budget_categories WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_budget_category(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<BudgetCategory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM budget_categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_budget_categories(
    pool: &SqlitePool,
    wedding_id: &str,
) -> Result<Vec<BudgetCategory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM budget_categories WHERE wedding_id = ? ORDER BY created_at ASC, rowid ASC")
        .bind(wedding_id)
        .fetch_all(pool)
        .await
}

pub async fn update_budget_category(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateBudgetCategoryRequest,
) -> Result<Option<BudgetCategory>, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE budget_categories SET
            name = COALESCE(?, name),
            estimated_cost = COALESCE(?, estimated_cost),
            actual_cost = COALESCE(?, actual_cost),
            is_paid = COALESCE(?, is_paid),
            priority = COALESCE(?, priority),
            notes = COALESCE(?, notes),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.estimated_cost)
    .bind(req.actual_cost)
    .bind(req.is_paid)
    .bind(req.priority.map(|p| p.to_string()))
    .bind(&req.notes)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_budget_category(pool, id).await
}

/// Delete a category together with its items
pub async fn delete_budget_category(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM budget_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert an item under a category. The wedding is taken from the category.
pub async fn insert_budget_item(
    pool: &SqlitePool,
    category: &BudgetCategory,
    req: &CreateBudgetItemRequest,
) -> Result<BudgetItem, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO budget_items (
            id, wedding_id, category_id, name, vendor, estimated_cost, actual_cost,
            is_paid, due_date, notes, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&category.wedding_id)
    .bind(&category.id)
    .bind(req.name.trim())
    .bind(&req.vendor)
    .bind(req.estimated_cost)
    .bind(req.actual_cost)
    .bind(req.is_paid)
    .bind(&req.due_date)
    .bind(&req.notes)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM budget_items WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub async fn get_budget_item(pool: &SqlitePool, id: &str) -> Result<Option<BudgetItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM budget_items WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_budget_items(
    pool: &SqlitePool,
    wedding_id: &str,
) -> Result<Vec<BudgetItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM budget_items WHERE wedding_id = ? ORDER BY category_id ASC, created_at ASC, rowid ASC",
    )
    .bind(wedding_id)
    .fetch_all(pool)
    .await
}

pub async fn update_budget_item(
    pool: &SqlitePool,
    id: &str,
    req: &UpdateBudgetItemRequest,
) -> Result<Option<BudgetItem>, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE budget_items SET
            name = COALESCE(?, name),
            vendor = COALESCE(?, vendor),
            estimated_cost = COALESCE(?, estimated_cost),
            actual_cost = COALESCE(?, actual_cost),
            is_paid = COALESCE(?, is_paid),
            due_date = COALESCE(?, due_date),
            notes = COALESCE(?, notes),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.vendor)
    .bind(req.estimated_cost)
    .bind(req.actual_cost)
    .bind(req.is_paid)
    .bind(&req.due_date)
    .bind(&req.notes)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_budget_item(pool, id).await
}

pub async fn delete_budget_item(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM budget_items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
