//! Category API endpoints
//!
//! Public listing with recipe counts and per-category recipe listings;
//! creation and deletion are admin operations. A category that still
//! contains recipes cannot be deleted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::recipes::{map_recipe_error, ListRecipesQuery};
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, ListParams, PagedResult, Recipe};
use crate::services::category::CategoryServiceError;

/// Build the public category router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}/recipes", get(list_category_recipes))
}

/// Build the admin-only category router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/{slug}", delete(delete_category))
}

/// GET /api/v1/categories - List all categories with recipe counts
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    let categories = state
        .category_service
        .list_with_counts()
        .await
        .map_err(map_category_error)?;

    Ok(Json(categories))
}

/// GET /api/v1/categories/{slug}/recipes - List recipes in a category
async fn list_category_recipes(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListRecipesQuery>,
) -> Result<Json<PagedResult<Recipe>>, ApiError> {
    let category = state
        .category_service
        .get_by_slug(&slug)
        .await
        .map_err(map_category_error)?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let params = ListParams::new(query.page, query.per_page);
    let result = state
        .recipe_service
        .list(Some(category.id), &params)
        .await
        .map_err(map_recipe_error)?;

    Ok(Json(result))
}

/// POST /api/v1/categories - Create a category (admin only)
async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state
        .category_service
        .create(input)
        .await
        .map_err(map_category_error)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /api/v1/categories/{slug} - Delete a category (admin only)
///
/// Refused with a conflict while any recipe still references it.
async fn delete_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let category = state
        .category_service
        .get_by_slug(&slug)
        .await
        .map_err(map_category_error)?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    state
        .category_service
        .delete(category.id)
        .await
        .map_err(map_category_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_category_error(error: CategoryServiceError) -> ApiError {
    match error {
        CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        CategoryServiceError::DuplicateCategory(msg) => ApiError::conflict(msg),
        CategoryServiceError::NotFound => ApiError::not_found("Category not found"),
        CategoryServiceError::NotEmpty(count) => ApiError::conflict(format!(
            "Category still contains {} recipe(s)",
            count
        )),
        CategoryServiceError::InternalError(e) => {
            tracing::error!("Category service error: {:?}", e);
            ApiError::internal_error("Internal server error")
        }
    }
}
