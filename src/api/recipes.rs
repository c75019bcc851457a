//! Recipe API endpoints
//!
//! Public browsing (paginated listing, detail by slug) and the writing
//! endpoints. Creation needs the writer role (route layer); edit and
//! delete rights are object-level and checked in the service.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreateRecipeInput, Image, ListParams, PagedResult, Recipe, Role, UpdateRecipeInput,
};
use crate::services::recipe::RecipeServiceError;

/// Query parameters for recipe listings
#[derive(Debug, Deserialize)]
pub struct ListRecipesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Category slug to filter by
    pub category: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

/// Author summary shown on recipe detail pages
#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub usergroup: String,
    pub role: Role,
}

/// Full recipe detail with attached images and author
#[derive(Debug, Serialize)]
pub struct RecipeDetailResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub theme: Option<String>,
    pub ingredients: String,
    pub content: String,
    pub category_id: i64,
    pub author: Option<AuthorSummary>,
    pub images: Vec<Image>,
    pub created_at: DateTime<Utc>,
}

/// Build the public recipe router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recipes))
        .route("/{slug}", get(get_recipe))
}

/// Build the writer recipe router (writer role required)
pub fn writer_router() -> Router<AppState> {
    Router::new().route("/", post(create_recipe))
}

/// Build the protected recipe router (object-level checks in the service)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/{slug}", put(update_recipe))
        .route("/{slug}", delete(delete_recipe))
}

/// GET /api/v1/recipes - Paginated recipe listing, newest first
///
/// `?category=<slug>` narrows the listing to one category.
async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<ListRecipesQuery>,
) -> Result<Json<PagedResult<Recipe>>, ApiError> {
    let category_id = match query.category {
        Some(ref slug) => {
            let category = state
                .category_service
                .get_by_slug(slug)
                .await
                .map_err(|e| {
                    tracing::error!("Category lookup failed: {:?}", e);
                    ApiError::internal_error("Internal server error")
                })?
                .ok_or_else(|| ApiError::not_found("Category not found"))?;
            Some(category.id)
        }
        None => None,
    };

    let params = ListParams::new(query.page, query.per_page);
    let result = state
        .recipe_service
        .list(category_id, &params)
        .await
        .map_err(map_recipe_error)?;

    Ok(Json(result))
}

/// GET /api/v1/recipes/{slug} - Recipe detail with images and author
async fn get_recipe(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RecipeDetailResponse>, ApiError> {
    let (recipe, images) = state
        .recipe_service
        .get_by_slug(&slug)
        .await
        .map_err(map_recipe_error)?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let author = match recipe.author_id {
        Some(author_id) => state
            .user_service
            .get_by_id(author_id)
            .await
            .map_err(|e| {
                tracing::error!("Author lookup failed: {:?}", e);
                ApiError::internal_error("Internal server error")
            })?
            .map(|u| AuthorSummary {
                id: u.id,
                username: u.username,
                usergroup: u.usergroup,
                role: u.role,
            }),
        None => None,
    };

    Ok(Json(RecipeDetailResponse {
        id: recipe.id,
        slug: recipe.slug,
        title: recipe.title,
        theme: recipe.theme,
        ingredients: recipe.ingredients,
        content: recipe.content,
        category_id: recipe.category_id,
        author,
        images,
        created_at: recipe.created_at,
    }))
}

/// POST /api/v1/recipes - Create a recipe (writer role required)
async fn create_recipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateRecipeInput>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state
        .recipe_service
        .create(&user.0, input)
        .await
        .map_err(map_recipe_error)?;

    Ok((StatusCode::CREATED, Json(recipe)))
}

/// PUT /api/v1/recipes/{slug} - Update a recipe
///
/// Editors edit any recipe; writers only their own.
async fn update_recipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Json(input): Json<UpdateRecipeInput>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = resolve_recipe(&state, &slug).await?;

    let updated = state
        .recipe_service
        .update(&user.0, recipe.id, input)
        .await
        .map_err(map_recipe_error)?;

    Ok(Json(updated))
}

/// DELETE /api/v1/recipes/{slug} - Delete a recipe
///
/// Admins delete any recipe; otherwise only the author may.
async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let recipe = resolve_recipe(&state, &slug).await?;

    state
        .recipe_service
        .delete(&user.0, recipe.id)
        .await
        .map_err(map_recipe_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Resolve a slug to its recipe, or a 404
pub(crate) async fn resolve_recipe(state: &AppState, slug: &str) -> Result<Recipe, ApiError> {
    state
        .recipe_service
        .resolve_slug(slug)
        .await
        .map_err(map_recipe_error)?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

pub(crate) fn map_recipe_error(error: RecipeServiceError) -> ApiError {
    match error {
        RecipeServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        RecipeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        RecipeServiceError::NotFound => ApiError::not_found("Recipe not found"),
        RecipeServiceError::InternalError(e) => {
            tracing::error!("Recipe service error: {:?}", e);
            ApiError::internal_error("Internal server error")
        }
    }
}
