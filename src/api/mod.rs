//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Cocotte recipe
//! platform. It includes:
//! - Auth API endpoints (register, confirm, login, password flows)
//! - User API endpoints
//! - Category API endpoints
//! - Recipe API endpoints
//! - Comment API endpoints
//! - Upload API endpoints
//! - Static serving of uploaded files

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub mod auth;
pub mod categories;
pub mod comments;
pub mod middleware;
pub mod recipes;
pub mod upload;
pub mod users;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/users", users::admin_router())
        .nest("/categories", categories::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Writer routes (need writer role)
    let writer_routes = Router::new()
        .nest("/recipes", recipes::writer_router())
        .nest("/upload", upload::router())
        .route_layer(axum_middleware::from_fn(middleware::require_writer))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth; object-level rules live in the services)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/users", users::router())
        .nest("/recipes", recipes::protected_router())
        .nest("/recipes", comments::protected_recipe_router())
        .nest("/comments", comments::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/categories", categories::router())
        .nest("/recipes", recipes::router())
        .nest("/recipes", comments::recipe_router())
        .merge(admin_routes)
        .merge(writer_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // CORS must allow credentials for cookie auth
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let uploads_dir = state.upload_config.path.clone();

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SmtpConfig, UploadConfig};
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxCommentRepository, SqlxImageRepository, SqlxRecipeRepository,
        SqlxSessionRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::Role;
    use crate::services::{
        account::AccountService, category::CategoryService, comment::CommentService,
        mailer::Mailer, rate_limiter::LoginRateLimiter, recipe::RecipeService, user::UserService,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    async fn spawn_server() -> (TestServer, DynDatabasePool) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let image_repo = SqlxImageRepository::boxed(pool.clone());

        let mailer = Arc::new(Mailer::new(
            SmtpConfig::default(),
            "http://localhost:8080".to_string(),
        ));
        let rate_limiter = Arc::new(LoginRateLimiter::new());

        let state = AppState {
            pool: pool.clone(),
            account_service: Arc::new(AccountService::new(
                user_repo.clone(),
                session_repo,
                mailer,
                rate_limiter.clone(),
            )),
            user_service: Arc::new(UserService::new(user_repo)),
            category_service: Arc::new(CategoryService::new(category_repo.clone())),
            recipe_service: Arc::new(RecipeService::new(
                recipe_repo.clone(),
                category_repo,
                image_repo.clone(),
            )),
            comment_service: Arc::new(CommentService::new(comment_repo, recipe_repo)),
            image_repo,
            upload_config: Arc::new(UploadConfig::default()),
            rate_limiter,
        };

        let app = build_router(state, "http://localhost:3000");
        let server = TestServer::new(app).expect("Failed to start test server");
        (server, pool)
    }

    /// Register an account, confirm it via the stored token, and log in.
    /// Returns the session token.
    async fn register_and_login(
        server: &TestServer,
        pool: &DynDatabasePool,
        username: &str,
        role: Role,
    ) -> String {
        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "usergroup": "Test Kitchen",
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "Qwerty0000",
                "retyped_password": "Qwerty0000",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let user_repo = SqlxUserRepository::new(pool.clone());
        let mut user = user_repo
            .get_by_username(username)
            .await
            .unwrap()
            .expect("registered user missing");
        let token = user.confirmation_token.clone().expect("no confirmation token");

        let response = server
            .post("/api/v1/auth/confirm")
            .json(&json!({ "token": token }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        if role != Role::Subscriber {
            user = user_repo.get_by_username(username).await.unwrap().unwrap();
            user.role = role;
            user_repo.update(&user).await.unwrap();
        }

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({
                "username_or_email": username,
                "password": "Qwerty0000",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: serde_json::Value = response.json();
        body["token"].as_str().expect("missing token").to_string()
    }

    #[tokio::test]
    async fn test_login_refused_before_confirmation() {
        let (server, _pool) = spawn_server().await;

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "usergroup": "Test Kitchen",
                "username": "pending",
                "email": "pending@example.com",
                "password": "Qwerty0000",
                "retyped_password": "Qwerty0000",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({
                "username_or_email": "pending",
                "password": "Qwerty0000",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "ACCOUNT_DISABLED");
    }

    #[tokio::test]
    async fn test_me_requires_auth() {
        let (server, _pool) = spawn_server().await;

        let response = server.get("/api/v1/auth/me").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_full_content_flow() {
        let (server, pool) = spawn_server().await;

        let admin_token = register_and_login(&server, &pool, "chef", Role::Admin).await;

        // Admin creates a category
        let response = server
            .post("/api/v1/categories")
            .authorization_bearer(&admin_token)
            .json(&json!({ "name": "Desserts" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let category: serde_json::Value = response.json();
        assert_eq!(category["slug"], "desserts");

        // Admin posts a recipe into it
        let response = server
            .post("/api/v1/recipes")
            .authorization_bearer(&admin_token)
            .json(&json!({
                "title": "Tarte Tatin",
                "ingredients": "6 apples, sugar, butter, pastry",
                "content": "Caramelize, arrange, cover, bake, flip while warm.",
                "category_id": category["id"],
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let recipe: serde_json::Value = response.json();
        assert_eq!(recipe["slug"], "tarte-tatin");

        // Public listing and detail
        let response = server.get("/api/v1/recipes").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let listing: serde_json::Value = response.json();
        assert_eq!(listing["total"], 1);

        let response = server.get("/api/v1/recipes/tarte-tatin").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let detail: serde_json::Value = response.json();
        assert_eq!(detail["author"]["username"], "chef");

        // A subscriber comments on it
        let reader_token = register_and_login(&server, &pool, "reader", Role::Subscriber).await;
        let response = server
            .post("/api/v1/recipes/tarte-tatin/comments")
            .authorization_bearer(&reader_token)
            .json(&json!({ "content": "Came out perfectly.", "rating": 5 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = server.get("/api/v1/recipes/tarte-tatin/comments").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let comments: serde_json::Value = response.json();
        assert_eq!(comments["total"], 1);
        assert_eq!(comments["items"][0]["username"], "reader");
    }

    #[tokio::test]
    async fn test_role_gates_on_routes() {
        let (server, pool) = spawn_server().await;

        let reader_token = register_and_login(&server, &pool, "reader", Role::Subscriber).await;

        // Subscribers cannot create categories or recipes
        let response = server
            .post("/api/v1/categories")
            .authorization_bearer(&reader_token)
            .json(&json!({ "name": "Soups" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .post("/api/v1/recipes")
            .authorization_bearer(&reader_token)
            .json(&json!({
                "title": "Onion Soup",
                "ingredients": "onions, broth",
                "content": "Slice the onions thin and simmer them slowly.",
                "category_id": 1,
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        // Anonymous cannot create at all
        let response = server
            .post("/api/v1/categories")
            .json(&json!({ "name": "Soups" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_category_delete_refused_while_referenced() {
        let (server, pool) = spawn_server().await;

        let admin_token = register_and_login(&server, &pool, "chef", Role::Admin).await;

        let response = server
            .post("/api/v1/categories")
            .authorization_bearer(&admin_token)
            .json(&json!({ "name": "Desserts" }))
            .await;
        let category: serde_json::Value = response.json();

        let response = server
            .post("/api/v1/recipes")
            .authorization_bearer(&admin_token)
            .json(&json!({
                "title": "Chocolate Mousse",
                "ingredients": "chocolate, eggs",
                "content": "Melt, separate, fold, chill for four hours.",
                "category_id": category["id"],
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = server
            .delete("/api/v1/categories/desserts")
            .authorization_bearer(&admin_token)
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);

        // Deleting the recipe frees the category
        let response = server
            .delete("/api/v1/recipes/chocolate-mousse")
            .authorization_bearer(&admin_token)
            .await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

        let response = server
            .delete("/api/v1/categories/desserts")
            .authorization_bearer(&admin_token)
            .await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    }
}
