//! User API endpoints
//!
//! Profile viewing and editing for authenticated users, plus the admin
//! endpoints for listing, role assignment, and account deletion.
//! Object-level rules (self-or-admin, superadmin-only role changes)
//! live in the service; handlers translate errors into API responses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ListParams, PagedResult, Role, UpdateUserInput, User};
use crate::services::user::UserServiceError;

/// User as seen by other users
///
/// The email is only present when the viewer is the user themselves
/// or an admin.
#[derive(Debug, Serialize)]
pub struct PublicUserResponse {
    pub id: i64,
    pub usergroup: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl PublicUserResponse {
    fn from_user(user: User, viewer: &User) -> Self {
        let show_email = viewer.id == user.id || viewer.is_admin();
        Self {
            id: user.id,
            usergroup: user.usergroup,
            username: user.username,
            email: show_email.then_some(user.email),
            role: user.role,
            enabled: user.enabled,
            created_at: user.created_at,
        }
    }
}

/// Query parameters for the user listing
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

/// Request to assign a role
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

/// Build the user router (authentication required)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_user))
        .route("/{id}", put(update_user))
}

/// Build the admin-only user router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}/role", put(assign_role))
        .route("/{id}", delete(delete_user))
}

/// GET /api/v1/users/{id} - Get a user's profile
async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let target = state
        .user_service
        .get_by_id(id)
        .await
        .map_err(map_user_error)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(PublicUserResponse::from_user(target, &user.0)))
}

/// PUT /api/v1/users/{id} - Update a user's profile
///
/// Users edit their own profile; admins may edit anyone's.
async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let updated = state
        .user_service
        .update_profile(&user.0, id, input)
        .await
        .map_err(map_user_error)?;

    Ok(Json(PublicUserResponse::from_user(updated, &user.0)))
}

/// GET /api/v1/users - Paginated user listing (admin only)
async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PagedResult<PublicUserResponse>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);

    let result = state
        .user_service
        .list(&params)
        .await
        .map_err(map_user_error)?;

    let viewer = user.0;
    Ok(Json(
        result.map(|u| PublicUserResponse::from_user(u, &viewer)),
    ))
}

/// PUT /api/v1/users/{id}/role - Assign a role (superadmin only)
async fn assign_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<AssignRoleRequest>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let role = Role::from_str(&request.role)
        .map_err(|_| ApiError::validation_error(format!("Invalid role: {}", request.role)))?;

    let updated = state
        .user_service
        .assign_role(&user.0, id, role)
        .await
        .map_err(map_user_error)?;

    Ok(Json(PublicUserResponse::from_user(updated, &user.0)))
}

/// DELETE /api/v1/users/{id} - Delete an account (admin only)
async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .delete(&user.0, id)
        .await
        .map_err(map_user_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_user_error(error: UserServiceError) -> ApiError {
    match error {
        UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::UserExists(msg) => ApiError::conflict(msg),
        UserServiceError::NotFound => ApiError::not_found("User not found"),
        UserServiceError::InternalError(e) => {
            tracing::error!("User service error: {:?}", e);
            ApiError::internal_error("Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(id: i64, role: Role) -> User {
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

    #[test]
    fn test_email_visible_to_self() {
        let user = make_user(1, Role::Subscriber);
        let response = PublicUserResponse::from_user(user.clone(), &user);
        assert_eq!(response.email.as_deref(), Some("user1@example.com"));
    }

    #[test]
    fn test_email_hidden_from_others() {
        let target = make_user(1, Role::Subscriber);
        let viewer = make_user(2, Role::Editor);
        let response = PublicUserResponse::from_user(target, &viewer);
        assert!(response.email.is_none());
    }

    #[test]
    fn test_email_visible_to_admin() {
        let target = make_user(1, Role::Subscriber);
        let admin = make_user(2, Role::Admin);
        let response = PublicUserResponse::from_user(target, &admin);
        assert_eq!(response.email.as_deref(), Some("user1@example.com"));
    }
}
