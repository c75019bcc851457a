//! Authentication API endpoints
//!
//! Handles HTTP requests for the account lifecycle:
//! - POST /api/v1/auth/register - Registration (account starts disabled)
//! - POST /api/v1/auth/confirm - Account confirmation by emailed token
//! - POST /api/v1/auth/login - Login
//! - POST /api/v1/auth/logout - Logout
//! - GET /api/v1/auth/me - Current user
//! - POST /api/v1/auth/forgot-password - Start a password reset
//! - POST /api/v1/auth/reset-password - Complete a password reset
//! - PUT /api/v1/auth/password - Change password

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::services::account::{AccountServiceError, LoginInput};

/// Session cookie lifetime in seconds (7 days, matching session expiry)
const SESSION_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub usergroup: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub retyped_password: String,
}

/// Request body for account confirmation
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub token: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Request body for starting a password reset
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for completing a password reset
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub retyped_password: String,
}

/// Request body for changing the password
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub retyped_password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub usergroup: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub enabled: bool,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            usergroup: user.usergroup,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            enabled: user.enabled,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/confirm", post(confirm))
        .route("/confirm/{token}", get(confirm_by_link))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route("/password", put(change_password))
}

fn session_cookie(token: &str) -> HeaderMap {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, SESSION_COOKIE_MAX_AGE
    );

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}

fn clear_session_cookie() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    headers
}

fn map_account_error(e: AccountServiceError) -> ApiError {
    match e {
        AccountServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
        AccountServiceError::AccountDisabled => {
            ApiError::account_disabled("Account is not confirmed or has been disabled")
        }
        AccountServiceError::RateLimited(msg) => ApiError::rate_limited(msg),
        AccountServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        AccountServiceError::UserExists(msg) => ApiError::conflict(msg),
        AccountServiceError::NotFound(msg) => ApiError::not_found(msg),
        AccountServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}

/// POST /api/v1/auth/register - User registration
///
/// The account starts disabled; the confirmation email carries the
/// token that enables it. No session is issued until then.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = crate::models::CreateUserInput {
        usergroup: body.usergroup,
        username: body.username,
        email: body.email,
        password: body.password,
        retyped_password: body.retyped_password,
    };

    let user = state
        .account_service
        .register(input)
        .await
        .map_err(map_account_error)?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/v1/auth/confirm - Account confirmation
async fn confirm(
    State(state): State<AppState>,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .account_service
        .confirm(&body.token)
        .await
        .map_err(map_account_error)?;

    Ok(Json(user.into()))
}

/// GET /api/v1/auth/confirm/{token} - Confirmation via the emailed link
async fn confirm_by_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .account_service
        .confirm(&token)
        .await
        .map_err(map_account_error)?;

    Ok(Json(user.into()))
}

/// POST /api/v1/auth/login - User login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip_address = extract_ip_address(&headers);
    let ip = ip_address.as_ref().and_then(|s| s.parse().ok());

    let input = LoginInput::new(body.username_or_email.clone(), body.password);

    let result = state.account_service.login(input, ip).await;

    match result {
        Ok((session, user)) => {
            log_login_attempt(&state.pool, &body.username_or_email, ip_address.as_deref(), true)
                .await;

            Ok((
                session_cookie(&session.id),
                Json(AuthResponse {
                    user: user.into(),
                    token: session.id,
                }),
            ))
        }
        Err(e) => {
            log_login_attempt(&state.pool, &body.username_or_email, ip_address.as_deref(), false)
                .await;
            Err(map_account_error(e))
        }
    }
}

/// POST /api/v1/auth/logout - User logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .or_else(|| {
            headers
                .get(header::COOKIE)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| {
                    s.split(';')
                        .map(|c| c.trim())
                        .find_map(|c| c.strip_prefix("session="))
                })
        })
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state
        .account_service
        .logout(token)
        .await
        .map_err(map_account_error)?;

    Ok((StatusCode::NO_CONTENT, clear_session_cookie()))
}

/// GET /api/v1/auth/me - Get current user
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// POST /api/v1/auth/forgot-password - Start a password reset
///
/// Always answers 200 so the endpoint cannot be used to probe which
/// emails exist.
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .account_service
        .forgot_password(&body.email)
        .await
        .map_err(map_account_error)?;

    Ok(Json(serde_json::json!({
        "message": "If the email is registered, a reset link has been sent"
    })))
}

/// POST /api/v1/auth/reset-password - Complete a password reset
///
/// Revokes every existing session and hands back a fresh one.
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state
        .account_service
        .reset_password(&body.token, &body.new_password, &body.retyped_password)
        .await
        .map_err(map_account_error)?;

    Ok((
        session_cookie(&session.id),
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// PUT /api/v1/auth/password - Change current user's password
///
/// Verifies the current password, then revokes every session and hands
/// back a fresh one.
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .account_service
        .change_password(
            user.0.id,
            &body.current_password,
            &body.new_password,
            &body.retyped_password,
        )
        .await
        .map_err(map_account_error)?;

    Ok((
        session_cookie(&session.id),
        Json(serde_json::json!({ "token": session.id })),
    ))
}

// ============================================================================
// Helper Functions for Security
// ============================================================================

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, then X-Real-IP.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the list
            if let Some(ip) = forwarded_str.split(',').next() {
                return Some(ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Log a login attempt for security auditing, best effort
async fn log_login_attempt(
    pool: &DynDatabasePool,
    username: &str,
    ip_address: Option<&str>,
    success: bool,
) {
    let success_int = if success { 1 } else { 0 };

    let result: Result<(), sqlx::Error> = match pool.driver() {
        DatabaseDriver::Sqlite => sqlx::query(
            "INSERT INTO login_logs (username, ip_address, success) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(ip_address)
        .bind(success_int)
        .execute(pool.as_sqlite().unwrap())
        .await
        .map(|_| ()),
        DatabaseDriver::Mysql => sqlx::query(
            "INSERT INTO login_logs (username, ip_address, success) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(ip_address)
        .bind(success_int)
        .execute(pool.as_mysql().unwrap())
        .await
        .map(|_| ()),
    };

    if let Err(e) = result {
        tracing::warn!("Failed to log login attempt: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_from_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(extract_ip_address(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_extract_ip_from_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_ip_address(&headers), Some("198.51.100.4".to_string()));
    }

    #[test]
    fn test_extract_ip_missing() {
        let headers = HeaderMap::new();
        assert!(extract_ip_address(&headers).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let headers = session_cookie("abc123");
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("session=abc123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_clear_session_cookie() {
        let headers = clear_session_cookie();
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
