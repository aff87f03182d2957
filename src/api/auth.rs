use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::{
    actions, create_session, delete_expired_sessions, delete_session, find_session_user,
    get_user_by_email, insert_user, resource_types, CreateWeddingRequest, LoginRequest,
    LoginResponse, RegisterRequest, User, UserResponse, UserRole, WeddingResponse,
};
use crate::AppState;

use super::audit::audit_log;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_name, validate_password};
use super::weddings::create_wedding_for;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random bearer token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Open a session for a user and return its bearer token
async fn start_session(state: &AppState, user: &User) -> Result<String, ApiError> {
    let token = generate_token();
    let expires_at = (chrono::Utc::now()
        + chrono::Duration::hours(state.config.auth.session_ttl_hours))
    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    create_session(&state.db, &user.id, &hash_token(&token), &expires_at).await?;

    match delete_expired_sessions(&state.db).await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(purged, "Expired sessions removed"),
        Err(e) => tracing::warn!(error = %e, "Failed to remove expired sessions"),
    }

    Ok(token)
}

/// Create the configured admin account if no account uses its email yet
pub async fn ensure_admin_user(
    pool: &SqlitePool,
    email: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(existing) = get_user_by_email(pool, email).await? {
        if !existing.is_admin() {
            tracing::warn!(email = %email, "Configured admin email belongs to a non-admin account");
        }
        return Ok(());
    }

    let password = match password {
        Some(p) => p.to_string(),
        None => {
            let generated = generate_token()[..20].to_string();
            tracing::warn!(
                email = %email,
                password = %generated,
                "Generated initial admin password, change it after first login"
            );
            generated
        }
    };

    let hash = hash_password(&password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    insert_user(pool, email, &hash, "Administrator", UserRole::Admin).await?;

    tracing::info!(email = %email, "Created admin user");
    Ok(())
}

fn validate_registration(req: &RegisterRequest, errors: &mut ValidationErrorBuilder) {
    errors.check("email", validate_email(req.email.trim()));
    errors.check("password", validate_password(&req.password));
    errors.check("name", validate_name(&req.name, "Name"));
}

async fn register_user(state: &AppState, req: &RegisterRequest) -> Result<User, ApiError> {
    let email = req.email.trim().to_lowercase();
    if get_user_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    let user = insert_user(&state.db, &email, &hash, req.name.trim(), UserRole::User).await?;
    Ok(user)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    validate_registration(&req, &mut errors);
    errors.finish()?;

    let user = register_user(&state, &req).await?;
    let token = start_session(&state, &user).await?;

    audit_log(&state, actions::AUTH_REGISTER, resource_types::USER, Some(&user.id), Some(&user.id), &headers, None).await;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = get_user_by_email(&state.db, req.email.trim())
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let token = start_session(&state, &user).await?;
    audit_log(&state, actions::AUTH_LOGIN, resource_types::USER, Some(&user.id), Some(&user.id), &headers, None).await;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: User,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = extract_token(&headers) {
        delete_session(&state.db, &hash_token(token)).await?;
    }
    audit_log(&state, actions::AUTH_LOGOUT, resource_types::USER, Some(&user.id), Some(&user.id), &headers, None).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

#[derive(Debug, Deserialize)]
pub struct GetStartedRequest {
    #[serde(flatten)]
    pub account: RegisterRequest,
    pub wedding: CreateWeddingRequest,
}

#[derive(Debug, Serialize)]
pub struct GetStartedResponse {
    pub token: String,
    pub user: UserResponse,
    pub wedding: WeddingResponse,
}

/// Register an account and create its first wedding in one step
pub async fn get_started(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<GetStartedRequest>,
) -> Result<(StatusCode, Json<GetStartedResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    validate_registration(&req.account, &mut errors);
    super::weddings::validate_create(&req.wedding, &mut errors);
    errors.finish()?;

    // A fresh account never holds a subscription
    if state.config.subscription.require_payment {
        return Err(ApiError::forbidden(
            "A paid subscription is required to create a wedding",
        ));
    }

    let user = register_user(&state, &req.account).await?;
    let wedding = create_wedding_for(&state, &user, &user.id, &req.wedding).await?;
    let token = start_session(&state, &user).await?;

    audit_log(&state, actions::AUTH_REGISTER, resource_types::USER, Some(&user.id), Some(&user.id), &headers, None).await;
    audit_log(&state, actions::WEDDING_CREATE, resource_types::WEDDING, Some(&wedding.id), Some(&user.id), &headers, None).await;

    Ok((
        StatusCode::CREATED,
        Json(GetStartedResponse {
            token,
            user: UserResponse::from(user),
            wedding: WeddingResponse::from(wedding),
        }),
    ))
}

/// Extractor for the authenticated user of a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        find_session_user(&state.db, &hash_token(token))
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("wedding2026").unwrap();
        assert!(verify_password("wedding2026", &hash));
        assert!(!verify_password("wedding2027", &hash));
        assert!(!verify_password("wedding2026", "not-a-phc-string"));

        // Fresh salt per hash
        let again = hash_password("wedding2026").unwrap();
        assert_ne!(hash, again);
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_token_shape_and_hash() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_token());
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), "abc");
    }

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());

        headers.insert("Authorization", "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(extract_token(&headers).is_none());

        headers.insert("Authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("abc123"));
    }

    #[tokio::test]
    async fn test_ensure_admin_user_is_idempotent() {
        let pool = crate::db::init_memory().await.unwrap();
        ensure_admin_user(&pool, "admin@wedsite.local", Some("adminpass1")).await.unwrap();
        ensure_admin_user(&pool, "admin@wedsite.local", Some("different1")).await.unwrap();

        let admin = get_user_by_email(&pool, "admin@wedsite.local").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(verify_password("adminpass1", &admin.password_hash));
    }
}
