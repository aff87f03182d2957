use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    delete_budget_category, delete_budget_item, get_budget_category, get_budget_item,
    insert_budget_category, insert_budget_item, list_budget_categories, list_budget_items,
    update_budget_category, update_budget_item, BudgetCategory, BudgetItem, BudgetSummary,
    CreateBudgetCategoryRequest, CreateBudgetItemRequest, UpdateBudgetCategoryRequest,
    UpdateBudgetItemRequest, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_amount, validate_name, validate_optional_date, validate_optional_text};

const MAX_NOTES_LEN: usize = 1000;

fn check_costs(errors: &mut ValidationErrorBuilder, estimated: Option<i64>, actual: Option<i64>) {
    errors.check("estimated_cost", validate_amount(estimated, "Estimated cost"));
    errors.check("actual_cost", validate_amount(actual, "Actual cost"));
}

async fn load_category(state: &AppState, id: &str) -> Result<BudgetCategory, ApiError> {
    get_budget_category(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget category not found"))
}

async fn load_item(state: &AppState, id: &str) -> Result<BudgetItem, ApiError> {
    get_budget_item(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget item not found"))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<BudgetCategory>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::EditDetails).await?;
    Ok(Json(list_budget_categories(&state.db, &wedding_id).await?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateBudgetCategoryRequest>,
) -> Result<(StatusCode, Json<BudgetCategory>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_name(&req.name, "Category name"));
    check_costs(&mut errors, Some(req.estimated_cost), Some(req.actual_cost));
    errors.check("notes", validate_optional_text(&req.notes, "Notes", MAX_NOTES_LEN));
    errors.finish()?;

    access::authorize(&state.db, &user, &req.wedding_id, Operation::EditDetails).await?;

    let category = insert_budget_category(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateBudgetCategoryRequest>,
) -> Result<Json<BudgetCategory>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.name {
        errors.check("name", validate_name(name, "Category name"));
    }
    check_costs(&mut errors, req.estimated_cost, req.actual_cost);
    errors.check("notes", validate_optional_text(&req.notes, "Notes", MAX_NOTES_LEN));
    errors.finish()?;

    let category = load_category(&state, &id).await?;
    access::authorize(&state.db, &user, &category.wedding_id, Operation::EditDetails).await?;

    let updated = update_budget_category(&state.db, &id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget category not found"))?;
    Ok(Json(updated))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let category = load_category(&state, &id).await?;
    access::authorize(&state.db, &user, &category.wedding_id, Operation::EditDetails).await?;

    delete_budget_category(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<BudgetItem>>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::EditDetails).await?;
    Ok(Json(list_budget_items(&state.db, &wedding_id).await?))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateBudgetItemRequest>,
) -> Result<(StatusCode, Json<BudgetItem>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_name(&req.name, "Item name"));
    check_costs(&mut errors, Some(req.estimated_cost), Some(req.actual_cost));
    errors.check("due_date", validate_optional_date(&req.due_date, "Due date"));
    errors.check("notes", validate_optional_text(&req.notes, "Notes", MAX_NOTES_LEN));
    errors.finish()?;

    let category = get_budget_category(&state.db, &req.category_id)
        .await?
        .ok_or_else(|| ApiError::validation_field("category_id", "Budget category not found"))?;
    access::authorize(&state.db, &user, &category.wedding_id, Operation::EditDetails).await?;

    let item = insert_budget_item(&state.db, &category, &req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateBudgetItemRequest>,
) -> Result<Json<BudgetItem>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.name {
        errors.check("name", validate_name(name, "Item name"));
    }
    check_costs(&mut errors, req.estimated_cost, req.actual_cost);
    errors.check("due_date", validate_optional_date(&req.due_date, "Due date"));
    errors.check("notes", validate_optional_text(&req.notes, "Notes", MAX_NOTES_LEN));
    errors.finish()?;

    let item = load_item(&state, &id).await?;
    access::authorize(&state.db, &user, &item.wedding_id, Operation::EditDetails).await?;

    let updated = update_budget_item(&state.db, &id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget item not found"))?;
    Ok(Json(updated))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item = load_item(&state, &id).await?;
    access::authorize(&state.db, &user, &item.wedding_id, Operation::EditDetails).await?;

    delete_budget_item(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(wedding_id): Path<String>,
) -> Result<Json<BudgetSummary>, ApiError> {
    access::authorize(&state.db, &user, &wedding_id, Operation::EditDetails).await?;
    let categories = list_budget_categories(&state.db, &wedding_id).await?;
    Ok(Json(BudgetSummary::from_categories(&categories)))
}
