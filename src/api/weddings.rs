use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::access::{self, AccessView, Operation, ResolvedAccess};
use crate::db::{
    actions, delete_wedding as db_delete_wedding, generate_slug, get_user, get_wedding,
    get_wedding_by_slug, insert_wedding, list_weddings_for_user, resource_types, update_languages,
    update_wedding as db_update_wedding, wedding_stats, CreateWeddingRequest,
    UpdateWeddingRequest, User, UserRole, Wedding, WeddingLanguages, WeddingResponse,
    WeddingStats,
};
use crate::AppState;

use super::audit::audit_log;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_color, validate_date, validate_languages, validate_name, validate_optional_color,
    validate_optional_date, validate_optional_text, validate_optional_url, validate_story,
    validate_time,
};

const MAX_VENUE_LEN: usize = 200;

pub(super) fn validate_create(req: &CreateWeddingRequest, errors: &mut ValidationErrorBuilder) {
    errors.check("bride", validate_name(&req.bride, "Bride name"));
    errors.check("groom", validate_name(&req.groom, "Groom name"));
    errors.check("wedding_date", validate_date(&req.wedding_date, "Wedding date"));
    errors.check("wedding_time", validate_time(&req.wedding_time));
    errors.check("venue", validate_optional_text(&Some(req.venue.clone()), "Venue", MAX_VENUE_LEN));
    errors.check("story", validate_story(&Some(req.story.clone())));
    errors.check("primary_color", validate_color(&req.primary_color));
    errors.check("accent_color", validate_color(&req.accent_color));
    errors.check("background_music_url", validate_optional_url(&req.background_music_url));
}

fn validate_update(req: &UpdateWeddingRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(bride) = &req.bride {
        errors.check("bride", validate_name(bride, "Bride name"));
    }
    if let Some(groom) = &req.groom {
        errors.check("groom", validate_name(groom, "Groom name"));
    }
    errors.check("wedding_date", validate_optional_date(&req.wedding_date, "Wedding date"));
    errors.check("wedding_time", validate_time(&req.wedding_time));
    errors.check("venue", validate_optional_text(&req.venue, "Venue", MAX_VENUE_LEN));
    errors.check("story", validate_story(&req.story));
    errors.check("primary_color", validate_optional_color(&req.primary_color));
    errors.check("accent_color", validate_optional_color(&req.accent_color));
    errors.check("background_music_url", validate_optional_url(&req.background_music_url));
    errors.finish()
}

/// Create a wedding owned by `owner_id` on behalf of `actor`.
///
/// Guest manager accounts never create weddings. With payment required,
/// non-admin actors need a paid subscription.
pub(super) async fn create_wedding_for(
    state: &AppState,
    actor: &User,
    owner_id: &str,
    req: &CreateWeddingRequest,
) -> Result<Wedding, ApiError> {
    match actor.role_enum() {
        UserRole::GuestManager => {
            return Err(ApiError::forbidden("Guest managers cannot create weddings"));
        }
        UserRole::User
            if state.config.subscription.require_payment && !actor.has_paid_subscription =>
        {
            return Err(ApiError::forbidden(
                "A paid subscription is required to create a wedding",
            ));
        }
        _ => {}
    }

    let slug = generate_slug();
    let wedding = insert_wedding(&state.db, owner_id, &slug, req).await?;

    tracing::info!(
        wedding_id = %wedding.id,
        owner_id = %owner_id,
        slug = %wedding.unique_url,
        "Wedding created"
    );
    Ok(wedding)
}

/// Weddings the caller owns or has been granted access to
pub async fn list_weddings(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<WeddingResponse>>, ApiError> {
    let weddings = list_weddings_for_user(&state.db, &user.id).await?;
    Ok(Json(weddings.into_iter().map(WeddingResponse::from).collect()))
}

pub async fn create_wedding(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Json(req): Json<CreateWeddingRequest>,
) -> Result<(StatusCode, Json<WeddingResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    validate_create(&req, &mut errors);
    errors.finish()?;

    let owner_id = match req.user_id.as_deref() {
        Some(owner_id) if owner_id != user.id => {
            if !user.is_admin() {
                return Err(ApiError::forbidden(
                    "Only admins can create weddings for other users",
                ));
            }
            get_user(&state.db, owner_id)
                .await?
                .ok_or_else(|| ApiError::validation_field("user_id", "User not found"))?
                .id
        }
        _ => user.id.clone(),
    };

    let wedding = create_wedding_for(&state, &user, &owner_id, &req).await?;

    audit_log(
        &state,
        actions::WEDDING_CREATE,
        resource_types::WEDDING,
        Some(&wedding.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({ "owner_id": owner_id, "unique_url": wedding.unique_url })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(WeddingResponse::from(wedding))))
}

pub async fn get_wedding_handler(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<WeddingResponse>, ApiError> {
    let (wedding, _) = access::authorize(&state.db, &user, &id, Operation::ViewWedding).await?;
    Ok(Json(WeddingResponse::from(wedding)))
}

/// Public site lookup by slug. Private weddings are reported as missing.
pub async fn get_wedding_by_url(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<WeddingResponse>, ApiError> {
    let wedding = get_wedding_by_slug(&state.db, &slug)
        .await?
        .filter(|w| w.is_public)
        .ok_or_else(|| ApiError::not_found("Wedding not found"))?;
    Ok(Json(WeddingResponse::from(wedding)))
}

/// Partial update. The slug cannot be changed.
pub async fn update_wedding(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateWeddingRequest>,
) -> Result<Json<WeddingResponse>, ApiError> {
    validate_update(&req)?;
    access::authorize(&state.db, &user, &id, Operation::EditDetails).await?;

    let wedding = db_update_wedding(&state.db, &id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Wedding not found"))?;

    audit_log(&state, actions::WEDDING_UPDATE, resource_types::WEDDING, Some(&id), Some(&user.id), &headers, None).await;
    Ok(Json(WeddingResponse::from(wedding)))
}

pub async fn delete_wedding(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (wedding, _) = access::authorize(&state.db, &user, &id, Operation::DeleteWedding).await?;

    db_delete_wedding(&state.db, &wedding.id).await?;

    audit_log(
        &state,
        actions::WEDDING_DELETE,
        resource_types::WEDDING,
        Some(&wedding.id),
        Some(&user.id),
        &headers,
        Some(serde_json::json!({ "unique_url": wedding.unique_url })),
    )
    .await;
    tracing::info!(wedding_id = %wedding.id, "Wedding deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<WeddingStats>, ApiError> {
    access::authorize(&state.db, &user, &id, Operation::ViewStats).await?;
    Ok(Json(wedding_stats(&state.db, &id).await?))
}

/// The caller's resolved access on a wedding
pub async fn get_permissions(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<AccessView>, ApiError> {
    let wedding = get_wedding(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Wedding not found"))?;
    let resolved = access::resolve_access(&state.db, &user, &wedding).await?;

    if resolved == ResolvedAccess::None && !wedding.is_public {
        return Err(ApiError::not_found("Wedding not found"));
    }

    Ok(Json(AccessView::new(&wedding.id, &resolved)))
}

pub async fn get_languages(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<WeddingLanguages>, ApiError> {
    let (wedding, _) = access::authorize(&state.db, &user, &id, Operation::ViewWedding).await?;
    Ok(Json(WeddingLanguages::from(&wedding)))
}

pub async fn update_languages_handler(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<WeddingLanguages>,
) -> Result<Json<WeddingLanguages>, ApiError> {
    validate_languages(&req.default_language, &req.available_languages)
        .map_err(|msg| ApiError::validation_field("available_languages", msg))?;
    access::authorize(&state.db, &user, &id, Operation::EditDetails).await?;

    let mut langs = req;
    let mut seen = std::collections::HashSet::new();
    langs.available_languages.retain(|lang| seen.insert(lang.clone()));
    let wedding = update_languages(&state.db, &id, &langs)
        .await?
        .ok_or_else(|| ApiError::not_found("Wedding not found"))?;

    Ok(Json(WeddingLanguages::from(&wedding)))
}
