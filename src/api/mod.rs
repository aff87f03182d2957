mod access;
mod admin;
pub mod audit;
pub mod auth;
mod budget;
mod collaborators;
pub mod error;
mod guest_book;
mod guests;
mod invitations;
mod milestones;
mod photos;
pub mod rate_limit;
pub mod validation;
mod weddings;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public, strict rate limit)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    let onboarding_routes = Router::new()
        .route("/get-started", post(auth::get_started))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    // Handlers authenticate through the `User` extractor; public routes omit it
    let api_routes = Router::new()
        // Weddings
        .route("/weddings", get(weddings::list_weddings).post(weddings::create_wedding))
        .route("/weddings/url/:slug", get(weddings::get_wedding_by_url))
        .route(
            "/weddings/:id",
            get(weddings::get_wedding_handler)
                .put(weddings::update_wedding)
                .delete(weddings::delete_wedding),
        )
        .route("/weddings/:id/stats", get(weddings::get_stats))
        .route("/weddings/:id/permissions", get(weddings::get_permissions))
        .route(
            "/weddings/:id/languages",
            get(weddings::get_languages).put(weddings::update_languages_handler),
        )
        // Guests
        .route("/guests", post(guests::create_guest))
        .route("/guests/wedding/:wedding_id", get(guests::list_wedding_guests))
        .route("/guests/:id", put(guests::update_guest).delete(guests::delete_guest))
        .route("/guests/:id/rsvp", put(guests::submit_rsvp))
        // Guest book
        .route("/guest-book", post(guest_book::create_entry))
        .route("/guest-book/wedding/:wedding_id", get(guest_book::list_entries))
        .route("/guest-book/:id", delete(guest_book::delete_entry))
        // Photos
        .route("/photos", post(photos::create_photo))
        .route("/photos/wedding/:wedding_id", get(photos::list_wedding_photos))
        .route("/photos/:id", delete(photos::delete_photo))
        // Budget
        .route("/budget/categories", post(budget::create_category))
        .route("/budget/categories/wedding/:wedding_id", get(budget::list_categories))
        .route(
            "/budget/categories/:id",
            patch(budget::update_category).delete(budget::delete_category),
        )
        .route("/budget/items", post(budget::create_item))
        .route("/budget/items/wedding/:wedding_id", get(budget::list_items))
        .route(
            "/budget/items/:id",
            patch(budget::update_item).delete(budget::delete_item),
        )
        .route("/budget/summary/wedding/:wedding_id", get(budget::summary))
        // Milestones
        .route("/milestones", post(milestones::create_milestone))
        .route(
            "/milestones/wedding/:wedding_id",
            get(milestones::list_wedding_milestones),
        )
        .route(
            "/milestones/:id",
            patch(milestones::update_milestone).delete(milestones::delete_milestone),
        )
        .route("/milestones/:id/complete", post(milestones::complete_milestone))
        // Invitations
        .route("/invitations", post(invitations::create_invitation))
        .route(
            "/invitations/wedding/:wedding_id",
            get(invitations::list_wedding_invitations),
        )
        .route(
            "/invitations/guest/:guest_id",
            get(invitations::list_guest_invitations),
        )
        .route("/invitations/:id/status", patch(invitations::update_status))
        .route("/invitations/:id/reminder", post(invitations::send_reminder))
        // Collaborator invitations
        .route("/collaborators", post(collaborators::create_collaborator))
        .route("/collaborators/accept", post(collaborators::accept))
        .route(
            "/collaborators/wedding/:wedding_id",
            get(collaborators::list_wedding_collaborators),
        )
        .route("/collaborators/:id/status", patch(collaborators::update_status))
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", put(admin::update_user))
        .route("/admin/weddings", get(admin::list_weddings))
        .route("/admin/stats", get(admin::get_stats))
        .route("/admin/audit-logs", get(audit::list_logs))
        // Wedding access grants
        .route("/admin/wedding-access", post(access::grant_access))
        .route(
            "/admin/wedding-access/:id",
            get(access::list_wedding_access)
                .put(access::update_access)
                .delete(access::revoke_access),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ))
        .merge(onboarding_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.server))
        .with_state(state)
}

/// CORS policy from `[server].cors_origins`. An empty list allows any origin.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn health_check() -> &'static str {
    "OK"
}
