//! HTTP-level tests driving the full router against an in-memory database.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use wedsite::config::Config;
use wedsite::AppState;

const ADMIN_EMAIL: &str = "admin@wedsite.local";
const ADMIN_PASSWORD: &str = "adminpass1";

async fn test_app_with(config: Config) -> Router {
    let db = wedsite::db::init_memory().await.unwrap();
    wedsite::api::auth::ensure_admin_user(&db, ADMIN_EMAIL, Some(ADMIN_PASSWORD))
        .await
        .unwrap();
    wedsite::api::create_router(Arc::new(AppState::new(config, db)))
}

async fn test_app() -> Router {
    let mut config = Config::default();
    config.rate_limit.enabled = false;
    test_app_with(config).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "secret123", "name": "Test Couple" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn login_admin(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_wedding(app: &Router, token: &str, is_public: bool) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/weddings",
        Some(token),
        Some(json!({
            "bride": "Madina",
            "groom": "Sardor",
            "wedding_date": "2026-06-20",
            "is_public": is_public,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn create_guest(app: &Router, token: &str, wedding_id: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/guests",
        Some(token),
        Some(json!({ "wedding_id": wedding_id, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/weddings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_logout() {
    let app = test_app().await;
    let (token, user_id) = register(&app, "couple@example.com").await;

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id.as_str());
    assert_eq!(me["role"], "user");
    assert!(me.get("password_hash").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "couple@example.com", "password": "wrong-pass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = test_app().await;
    register(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "DUP@example.com", "password": "secret123", "name": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_validation_errors_carry_field_details() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "short", "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    let details = &body["error"]["details"];
    assert!(details.get("email").is_some());
    assert!(details.get("password").is_some());
    assert!(details.get("name").is_some());
}

#[tokio::test]
async fn test_get_started_creates_account_and_wedding() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/get-started",
        None,
        Some(json!({
            "email": "new@example.com",
            "password": "secret123",
            "name": "New Couple",
            "wedding": { "bride": "Nodira", "groom": "Bekzod", "wedding_date": "2026-09-12" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["wedding"]["user_id"], body["user"]["id"]);
    assert_eq!(body["wedding"]["unique_url"].as_str().unwrap().len(), 12);

    let token = body["token"].as_str().unwrap();
    let (status, weddings) = send(&app, Method::GET, "/api/weddings", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(weddings.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_started_requires_payment_when_configured() {
    let mut config = Config::default();
    config.rate_limit.enabled = false;
    config.subscription.require_payment = true;
    let app = test_app_with(config).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/get-started",
        None,
        Some(json!({
            "email": "new@example.com",
            "password": "secret123",
            "name": "New Couple",
            "wedding": { "bride": "Nodira", "groom": "Bekzod", "wedding_date": "2026-09-12" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_public_slug_lookup_hides_private_weddings() {
    let app = test_app().await;
    let (token, _) = register(&app, "owner@example.com").await;

    let public = create_wedding(&app, &token, true).await;
    let private = create_wedding(&app, &token, false).await;
    assert_ne!(public["unique_url"], private["unique_url"]);

    let uri = format!("/api/weddings/url/{}", public["unique_url"].as_str().unwrap());
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], public["id"]);

    let uri = format!("/api/weddings/url/{}", private["unique_url"].as_str().unwrap());
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stranger_gets_404_on_private_and_403_on_public() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (stranger, _) = register(&app, "stranger@example.com").await;

    let private = create_wedding(&app, &owner, false).await;
    let public = create_wedding(&app, &owner, true).await;

    let uri = format!("/api/weddings/{}", private["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/weddings/{}", public["id"].as_str().unwrap());
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&stranger),
        Some(json!({ "venue": "Somewhere else" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_permissions_view() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;

    let uri = format!("/api/weddings/{}/permissions", wedding["id"].as_str().unwrap());
    let (status, view) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["is_owner"], true);
    assert_eq!(view["is_admin"], false);
    for bit in [
        "can_edit_details",
        "can_manage_guests",
        "can_view_analytics",
        "can_manage_photos",
        "can_edit_guest_book",
    ] {
        assert_eq!(view["permissions"][bit], true, "{} should be set", bit);
    }
}

#[tokio::test]
async fn test_guest_manager_grant_lifecycle() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (helper, _) = register(&app, "helper@example.com").await;
    let wedding = create_wedding(&app, &owner, true).await;
    let wedding_id = wedding["id"].as_str().unwrap();

    // Nothing before the grant
    let guests_uri = format!("/api/guests/wedding/{}", wedding_id);
    let (status, _) = send(&app, Method::GET, &guests_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, grant) = send(
        &app,
        Method::POST,
        "/api/admin/wedding-access",
        Some(&owner),
        Some(json!({
            "wedding_id": wedding_id,
            "email": "helper@example.com",
            "access_level": "guest_manager",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", grant);
    assert_eq!(grant["permissions"]["can_manage_guests"], true);
    assert_eq!(grant["permissions"]["can_view_analytics"], true);
    assert_eq!(grant["permissions"]["can_edit_details"], false);

    // Duplicate grant
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/wedding-access",
        Some(&owner),
        Some(json!({
            "wedding_id": wedding_id,
            "email": "helper@example.com",
            "access_level": "viewer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Granted scope works, everything else does not
    create_guest(&app, &helper, wedding_id, "Aunt Dilnoza").await;
    let (status, guests) = send(&app, Method::GET, &guests_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guests.as_array().unwrap().len(), 1);

    let wedding_uri = format!("/api/weddings/{}", wedding_id);
    let (status, _) = send(
        &app,
        Method::PUT,
        &wedding_uri,
        Some(&helper),
        Some(json!({ "venue": "Elsewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Guest managers cannot manage grants
    let access_uri = format!("/api/admin/wedding-access/{}", wedding_id);
    let (status, _) = send(&app, Method::GET, &access_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, grants) = send(&app, Method::GET, &access_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grants[0]["user_email"], "helper@example.com");

    // Revocation removes everything
    let grant_uri = format!("/api/admin/wedding-access/{}", grant["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::DELETE, &grant_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &guests_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_grant_level_resets_permissions() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (_, helper_id) = register(&app, "helper@example.com").await;
    let wedding = create_wedding(&app, &owner, true).await;

    let (_, grant) = send(
        &app,
        Method::POST,
        "/api/admin/wedding-access",
        Some(&owner),
        Some(json!({
            "wedding_id": wedding["id"],
            "user_id": helper_id,
            "access_level": "viewer",
        })),
    )
    .await;
    assert_eq!(grant["permissions"]["can_manage_guests"], false);

    let uri = format!("/api/admin/wedding-access/{}", grant["id"].as_str().unwrap());
    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&owner),
        Some(json!({ "access_level": "owner" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["access_level"], "owner");
    assert_eq!(updated["permissions"]["can_edit_details"], true);
}

#[tokio::test]
async fn test_public_rsvp_submission() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let wedding = create_wedding(&app, &owner, true).await;
    let guest = create_guest(&app, &owner, wedding["id"].as_str().unwrap(), "Uncle Rustam").await;
    assert_eq!(guest["rsvp_status"], "pending");
    assert!(guest["responded_at"].is_null());

    let uri = format!("/api/guests/{}/rsvp", guest["id"].as_str().unwrap());
    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        None,
        Some(json!({ "rsvp_status": "confirmed", "message": "See you there!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["rsvp_status"], "confirmed");
    assert!(updated["responded_at"].is_string());
    assert_eq!(updated["message"], "See you there!");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        None,
        Some(json!({ "rsvp_status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stats_uri = format!("/api/weddings/{}/stats", wedding["id"].as_str().unwrap());
    let (status, stats) = send(&app, Method::GET, &stats_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_guests"], 1);
    assert_eq!(stats["confirmed_guests"], 1);
}

#[tokio::test]
async fn test_rsvp_on_private_wedding_is_not_found() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;
    let guest = create_guest(&app, &owner, wedding["id"].as_str().unwrap(), "Cousin Laylo").await;

    let uri = format!("/api/guests/{}/rsvp", guest["id"].as_str().unwrap());
    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        None,
        Some(json!({ "rsvp_status": "declined" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_book_public_flow_and_moderation() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (stranger, _) = register(&app, "stranger@example.com").await;
    let wedding = create_wedding(&app, &owner, true).await;
    let wedding_id = wedding["id"].as_str().unwrap();

    let (status, entry) = send(
        &app,
        Method::POST,
        "/api/guest-book",
        None,
        Some(json!({ "wedding_id": wedding_id, "guest_name": "Jasur", "message": "Congratulations!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/guest-book/wedding/{}", wedding_id);
    let (status, entries) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);

    let entry_uri = format!("/api/guest-book/{}", entry["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::DELETE, &entry_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &entry_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_private_gallery_and_guest_book_visible_to_wedding_team() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (stranger, _) = register(&app, "stranger@example.com").await;
    let (viewer, _) = register(&app, "viewer@example.com").await;
    let admin = login_admin(&app).await;
    let wedding = create_wedding(&app, &owner, true).await;
    let wedding_id = wedding["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/guest-book",
        None,
        Some(json!({ "wedding_id": wedding_id, "guest_name": "Jasur", "message": "Mubarak!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/photos",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "url": "https://img.example.com/1.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/wedding-access",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "email": "viewer@example.com", "access_level": "viewer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let wedding_uri = format!("/api/weddings/{}", wedding_id);
    let (status, _) = send(&app, Method::PUT, &wedding_uri, Some(&owner), Some(json!({ "is_public": false }))).await;
    assert_eq!(status, StatusCode::OK);

    let photos_uri = format!("/api/photos/wedding/{}", wedding_id);
    let book_uri = format!("/api/guest-book/wedding/{}", wedding_id);

    for token in [owner.as_str(), admin.as_str()] {
        let (status, photos) = send(&app, Method::GET, &photos_uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(photos.as_array().unwrap().len(), 1);
        let (status, entries) = send(&app, Method::GET, &book_uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entries.as_array().unwrap().len(), 1);
    }

    // A viewer sees the gallery but cannot moderate the guest book
    let (status, _) = send(&app, Method::GET, &photos_uri, Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &book_uri, Some(&viewer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for token in [None, Some(stranger.as_str())] {
        let (status, _) = send(&app, Method::GET, &photos_uri, token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, &book_uri, token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_budget_summary_over_categories() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;
    let wedding_id = wedding["id"].as_str().unwrap();

    for (name, estimated, actual, paid) in [("Venue", 10_000, 9_000, true), ("Music", 2_000, 1_000, false)] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/budget/categories",
            Some(&owner),
            Some(json!({
                "wedding_id": wedding_id,
                "name": name,
                "estimated_cost": estimated,
                "actual_cost": actual,
                "is_paid": paid,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let uri = format!("/api/budget/summary/wedding/{}", wedding_id);
    let (status, summary) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_estimated"], 12_000);
    assert_eq!(summary["total_actual"], 10_000);
    assert_eq!(summary["total_paid"], 9_000);
    assert_eq!(summary["category_count"], 2);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/budget/categories",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "name": "Flowers", "estimated_cost": -5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/budget/categories",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "name": "Cake", "actual_cost": i64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (_, summary) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(summary["total_actual"], 10_000);
}

#[tokio::test]
async fn test_milestone_completion() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;

    let (status, milestone) = send(
        &app,
        Method::POST,
        "/api/milestones",
        Some(&owner),
        Some(json!({
            "wedding_id": wedding["id"],
            "title": "Book the venue",
            "target_date": "2026-01-15",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", milestone);
    assert_eq!(milestone["is_completed"], false);

    let uri = format!("/api/milestones/{}/complete", milestone["id"].as_str().unwrap());
    let (status, done) = send(&app, Method::POST, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["is_completed"], true);
    assert!(done["completed_at"].is_string());
}

#[tokio::test]
async fn test_invitation_requires_guest_of_wedding() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (other, _) = register(&app, "other@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;
    let guest = create_guest(&app, &owner, wedding["id"].as_str().unwrap(), "Grandma Zulfiya").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/invitations",
        Some(&other),
        Some(json!({ "guest_id": guest["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, invitation) = send(
        &app,
        Method::POST,
        "/api/invitations",
        Some(&owner),
        Some(json!({ "guest_id": guest["id"], "channel": "email" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", invitation);
    assert_eq!(invitation["status"], "pending");
    assert_eq!(invitation["wedding_id"], wedding["id"]);

    let uri = format!("/api/invitations/{}/reminder", invitation["id"].as_str().unwrap());
    let (status, reminded) = send(&app, Method::POST, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reminded["reminder_count"], 1);

    let guest_uri = format!("/api/invitations/guest/{}", guest["id"].as_str().unwrap());
    let (status, listed) = send(&app, Method::GET, &guest_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], invitation["id"]);
    let (status, _) = send(&app, Method::GET, &guest_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, "/api/invitations/guest/missing", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collaborator_invite_accept_and_revoke() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (stranger, _) = register(&app, "stranger@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;
    let wedding_id = wedding["id"].as_str().unwrap();

    // The invitee does not need an account yet
    let (status, invite) = send(
        &app,
        Method::POST,
        "/api/collaborators",
        Some(&owner),
        Some(json!({
            "wedding_id": wedding_id,
            "email": "helper@example.com",
            "name": "Dilshod",
            "access_level": "guest_manager",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", invite);
    assert_eq!(invite["status"], "pending");
    assert_eq!(invite["permissions"]["can_manage_guests"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/collaborators",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "email": "HELPER@example.com", "access_level": "viewer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/collaborators",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "email": "owner@example.com", "access_level": "viewer" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let list_uri = format!("/api/collaborators/wedding/{}", wedding_id);
    let (status, _) = send(&app, Method::GET, &list_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, listed) = send(&app, Method::GET, &list_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Someone else cannot claim the invitation
    let accept_body = json!({ "wedding_id": wedding_id });
    let (status, _) = send(&app, Method::POST, "/api/collaborators/accept", Some(&stranger), Some(accept_body.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (helper, helper_id) = register(&app, "helper@example.com").await;
    let guests_uri = format!("/api/guests/wedding/{}", wedding_id);
    let (status, _) = send(&app, Method::GET, &guests_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, accepted) = send(&app, Method::POST, "/api/collaborators/accept", Some(&helper), Some(accept_body.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", accepted);
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["user_id"], helper_id.as_str());

    let (status, _) = send(&app, Method::GET, &guests_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::POST, "/api/collaborators/accept", Some(&helper), Some(accept_body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let status_uri = format!("/api/collaborators/{}/status", invite["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::PATCH, &status_uri, Some(&owner), Some(json!({ "status": "accepted" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Revoking an accepted invitation removes the grant it created
    let (status, revoked) = send(&app, Method::PATCH, &status_uri, Some(&owner), Some(json!({ "status": "revoked" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", revoked);
    assert_eq!(revoked["status"], "revoked");
    let (status, _) = send(&app, Method::GET, &guests_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collaborator_can_decline_own_invitation() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let (invitee, _) = register(&app, "late@example.com").await;
    let (stranger, _) = register(&app, "stranger@example.com").await;
    let wedding = create_wedding(&app, &owner, true).await;
    let wedding_id = wedding["id"].as_str().unwrap();

    let (status, invite) = send(
        &app,
        Method::POST,
        "/api/collaborators",
        Some(&owner),
        Some(json!({ "wedding_id": wedding_id, "email": "late@example.com", "access_level": "viewer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let status_uri = format!("/api/collaborators/{}/status", invite["id"].as_str().unwrap());
    let decline = json!({ "status": "declined" });
    let (status, _) = send(&app, Method::PATCH, &status_uri, Some(&stranger), Some(decline.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, declined) = send(&app, Method::PATCH, &status_uri, Some(&invitee), Some(decline)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(declined["status"], "declined");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/collaborators/accept",
        Some(&invitee),
        Some(json!({ "wedding_id": wedding_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The couple can re-open it
    let (status, reopened) = send(&app, Method::PATCH, &status_uri, Some(&owner), Some(json!({ "status": "pending" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "pending");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = test_app().await;
    let (user, user_id) = register(&app, "user@example.com").await;

    let (status, _) = send(&app, Method::GET, "/api/admin/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, "/api/admin/audit-logs", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = login_admin(&app).await;
    let (status, users) = send(&app, Method::GET, "/api/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let uri = format!("/api/admin/users/{}", user_id);
    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({ "role": "guest_manager", "has_paid_subscription": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "guest_manager");
    assert_eq!(updated["has_paid_subscription"], true);

    // Guest managers cannot create weddings
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/weddings",
        Some(&user),
        Some(json!({ "bride": "A", "groom": "B", "wedding_date": "2026-06-20" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = send(&app, Method::GET, "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["guest_managers"], 1);

    let (status, logs) = send(
        &app,
        Method::GET,
        "/api/admin/audit-logs?action=user.update",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["total"], 1);
}

#[tokio::test]
async fn test_admin_bypasses_wedding_permissions() {
    let app = test_app().await;
    let (owner, _) = register(&app, "owner@example.com").await;
    let wedding = create_wedding(&app, &owner, false).await;
    let admin = login_admin(&app).await;

    let uri = format!("/api/weddings/{}", wedding["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], wedding["id"]);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_rate_limit_returns_429() {
    let mut config = Config::default();
    config.rate_limit.auth_requests_per_window = 2;
    let app = test_app_with(config).await;

    let login = json!({ "email": "nobody@example.com", "password": "whatever1" });
    for _ in 0..2 {
        let (status, _) = send(&app, Method::POST, "/api/auth/login", None, Some(login.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(login.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_admin_user_creation_is_idempotent() {
    let db = wedsite::db::init_memory().await.unwrap();
    tokio_test::assert_ok!(
        wedsite::api::auth::ensure_admin_user(&db, ADMIN_EMAIL, Some(ADMIN_PASSWORD)).await
    );
    tokio_test::assert_ok!(
        wedsite::api::auth::ensure_admin_user(&db, ADMIN_EMAIL, None).await
    );
}
