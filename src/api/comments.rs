//! Comment API endpoints
//!
//! Listing is public; posting requires any authenticated account.
//! Authors may edit their own comments; deletion is open to the author
//! or an admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Comment, CommentWithAuthor, CreateCommentInput, ListParams, PagedResult, UpdateCommentInput,
};
use crate::services::comment::CommentServiceError;

/// Query parameters for comment listings
#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
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

/// Build the public comment router (nested under /recipes)
pub fn recipe_router() -> Router<AppState> {
    Router::new().route("/{slug}/comments", get(list_comments))
}

/// Build the protected comment routers
pub fn protected_recipe_router() -> Router<AppState> {
    Router::new().route("/{slug}/comments", post(create_comment))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(update_comment))
        .route("/{id}", delete(delete_comment))
}

/// GET /api/v1/recipes/{slug}/comments - List comments, newest first
async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<PagedResult<CommentWithAuthor>>, ApiError> {
    let recipe = crate::api::recipes::resolve_recipe(&state, &slug).await?;

    let params = ListParams::new(query.page, query.per_page);
    let result = state
        .comment_service
        .list_by_recipe(recipe.id, &params)
        .await
        .map_err(map_comment_error)?;

    Ok(Json(result))
}

/// POST /api/v1/recipes/{slug}/comments - Post a comment
async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let recipe = crate::api::recipes::resolve_recipe(&state, &slug).await?;

    let comment = state
        .comment_service
        .create(&user.0, recipe.id, input)
        .await
        .map_err(map_comment_error)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/v1/comments/{id} - Edit a comment (author only)
async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCommentInput>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .comment_service
        .update(&user.0, id, input)
        .await
        .map_err(map_comment_error)?;

    Ok(Json(comment))
}

/// DELETE /api/v1/comments/{id} - Delete a comment (author or admin)
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .comment_service
        .delete(&user.0, id)
        .await
        .map_err(map_comment_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_comment_error(error: CommentServiceError) -> ApiError {
    match error {
        CommentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        CommentServiceError::NotFound(msg) => ApiError::not_found(msg),
        CommentServiceError::InternalError(e) => {
            tracing::error!("Comment service error: {:?}", e);
            ApiError::internal_error("Internal server error")
        }
    }
}
