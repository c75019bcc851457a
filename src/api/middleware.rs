//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token validation)
//! - Authorization (role tier checking)

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{Role, User};
use crate::services::account::AccountService;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub account_service: Arc<AccountService>,
    pub user_service: Arc<crate::services::user::UserService>,
    pub category_service: Arc<crate::services::category::CategoryService>,
    pub recipe_service: Arc<crate::services::recipe::RecipeService>,
    pub comment_service: Arc<crate::services::comment::CommentService>,
    pub image_repo: Arc<dyn crate::db::repositories::ImageRepository>,
    pub upload_config: Arc<crate::config::UploadConfig>,
    pub rate_limiter: Arc<crate::services::rate_limiter::LoginRateLimiter>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// Extractor for AuthenticatedUser from request extensions
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn account_disabled(message: impl Into<String>) -> Self {
        Self::new("ACCOUNT_DISABLED", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "ACCOUNT_DISABLED" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Extract session token from request
///
/// The Authorization header wins over the session cookie.
pub fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .account_service
        .validate_session(&token)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session validation failed: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        if let Ok(Some(user)) = state.account_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

fn require_role(request: &Request, role: Role, label: &str) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.role.at_least(role) {
        return Err(ApiError::forbidden(format!("{} privileges required", label)));
    }

    Ok(())
}

/// Writer authorization middleware (writer tier or above)
pub async fn require_writer(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, Role::Writer, "Writer")?;
    Ok(next.run(request).await)
}

/// Editor authorization middleware (editor tier or above)
pub async fn require_editor(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, Role::Editor, "Editor")?;
    Ok(next.run(request).await)
}

/// Admin authorization middleware (admin tier or above)
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, Role::Admin, "Admin")?;
    Ok(next.run(request).await)
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Subscriber),
            Just(Role::Writer),
            Just(Role::Editor),
            Just(Role::Admin),
            Just(Role::Superadmin),
        ]
    }

    fn test_user(id: i64, role: Role) -> User {
        let mut user = User::new(
            "Test Kitchen".to_string(),
            format!("user{}", id),
            format!("user{}@example.com", id),
            "hash".to_string(),
            "token".to_string(),
        );
        user.id = id;
        user.role = role;
        user.enabled = true;
        user
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Only admin and superadmin clear the admin tier.
        #[test]
        fn property_admin_tier(role in role_strategy()) {
            let user = test_user(1, role);
            let expected = matches!(role, Role::Admin | Role::Superadmin);
            prop_assert_eq!(user.is_admin(), expected);
        }

        /// Writers edit only their own recipes, editors and above edit any.
        #[test]
        fn property_edit_rights(
            user_id in 1i64..100,
            author_id in 1i64..100,
            role in role_strategy(),
        ) {
            let user = test_user(user_id, role);
            let expected = role.at_least(Role::Editor) || user_id == author_id;
            prop_assert_eq!(user.can_edit_recipe(Some(author_id)), expected);
        }

        /// Deletion is the author's or an admin's call.
        #[test]
        fn property_delete_rights(
            user_id in 1i64..100,
            author_id in 1i64..100,
            role in role_strategy(),
        ) {
            let user = test_user(user_id, role);
            let expected = role.at_least(Role::Admin) || user_id == author_id;
            prop_assert_eq!(user.can_delete_recipe(Some(author_id)), expected);
        }
    }
}
