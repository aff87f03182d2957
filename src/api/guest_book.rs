use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{
    delete_guest_book_entry, get_guest_book_entry, get_wedding, insert_guest_book_entry,
    list_guest_book_entries, CreateGuestBookEntryRequest, GuestBookEntry, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_message, validate_name};

/// Public weddings accept anonymous guest-book posts. Everything else is
/// reported as missing.
async fn require_public_wedding(state: &AppState, wedding_id: &str) -> Result<(), ApiError> {
    match get_wedding(&state.db, wedding_id).await? {
        Some(w) if w.is_public => Ok(()),
        _ => Err(ApiError::not_found("Wedding not found")),
    }
}

pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGuestBookEntryRequest>,
) -> Result<(StatusCode, Json<GuestBookEntry>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("guest_name", validate_name(&req.guest_name, "Name"));
    errors.check("message", validate_message(&req.message, "Message"));
    errors.finish()?;

    require_public_wedding(&state, &req.wedding_id).await?;

    let entry = insert_guest_book_entry(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Entries of a public wedding, or of a private one for its moderators.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    user: Option<User>,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<GuestBookEntry>>, ApiError> {
    let wedding = get_wedding(&state.db, &wedding_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Wedding not found"))?;

    if !wedding.is_public {
        let user = user.ok_or_else(|| ApiError::not_found("Wedding not found"))?;
        let resolved = access::resolve_access(&state.db, &user, &wedding).await?;
        // No access at all reads as missing; partial access without moderation is 403
        access::check(&resolved, &wedding, Operation::ViewWedding)?;
        access::check(&resolved, &wedding, Operation::ModerateGuestBook)?;
    }

    Ok(Json(list_guest_book_entries(&state.db, &wedding.id).await?))
}

pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let entry = get_guest_book_entry(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Guest book entry not found"))?;
    access::authorize(&state.db, &user, &entry.wedding_id, Operation::ModerateGuestBook).await?;

    delete_guest_book_entry(&state.db, &entry.id).await?;
    tracing::info!(entry_id = %entry.id, wedding_id = %entry.wedding_id, "Guest book entry removed");
    Ok(StatusCode::NO_CONTENT)
}
