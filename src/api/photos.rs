use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::access::{self, Operation};
use crate::db::{delete_photo as db_delete_photo, get_photo, get_wedding, insert_photo, list_photos, CreatePhotoRequest, Photo, User};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_optional_text, validate_url};

const MAX_CAPTION_LEN: usize = 500;

pub async fn create_photo(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreatePhotoRequest>,
) -> Result<(StatusCode, Json<Photo>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("url", validate_url(req.url.trim()));
    errors.check("caption", validate_optional_text(&req.caption, "Caption", MAX_CAPTION_LEN));
    errors.finish()?;

    access::authorize(&state.db, &user, &req.wedding_id, Operation::ManagePhotos).await?;

    let photo = insert_photo(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

/// Gallery of a wedding. Private galleries need any access to the wedding.
pub async fn list_wedding_photos(
    State(state): State<Arc<AppState>>,
    user: Option<User>,
    Path(wedding_id): Path<String>,
) -> Result<Json<Vec<Photo>>, ApiError> {
    let wedding = get_wedding(&state.db, &wedding_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Wedding not found"))?;

    if !wedding.is_public {
        let user = user.ok_or_else(|| ApiError::not_found("Wedding not found"))?;
        let resolved = access::resolve_access(&state.db, &user, &wedding).await?;
        access::check(&resolved, &wedding, Operation::ViewWedding)?;
    }

    Ok(Json(list_photos(&state.db, &wedding.id).await?))
}

pub async fn delete_photo(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let photo = get_photo(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;
    access::authorize(&state.db, &user, &photo.wedding_id, Operation::ManagePhotos).await?;

    db_delete_photo(&state.db, &photo.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
