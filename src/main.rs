//! Cocotte - A recipe and blog platform REST API

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cocotte::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxCommentRepository, SqlxImageRepository,
            SqlxRecipeRepository, SqlxSessionRepository, SqlxUserRepository,
        },
    },
    seed,
    services::{
        account::AccountService, category::CategoryService, comment::CommentService,
        mailer::Mailer, rate_limiter::LoginRateLimiter, recipe::RecipeService, user::UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cocotte=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cocotte recipe platform...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    if std::env::args().any(|arg| arg == "--seed") {
        seed::run(pool.clone()).await?;
    }

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let image_repo = SqlxImageRepository::boxed(pool.clone());

    // Outgoing email (confirmation and password reset links)
    let mailer = Arc::new(Mailer::new(
        config.smtp.clone(),
        config.server.public_url.clone(),
    ));
    if !config.smtp.is_enabled() {
        tracing::warn!("SMTP not configured, outgoing emails will only be logged");
    }

    let rate_limiter = Arc::new(LoginRateLimiter::new());

    // Initialize services
    let account_service = Arc::new(AccountService::new(
        user_repo.clone(),
        session_repo,
        mailer,
        rate_limiter.clone(),
    ));
    let user_service = Arc::new(UserService::new(user_repo));
    let category_service = Arc::new(CategoryService::new(category_repo.clone()));
    let recipe_service = Arc::new(RecipeService::new(
        recipe_repo.clone(),
        category_repo,
        image_repo.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(comment_repo, recipe_repo));

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        account_service: account_service.clone(),
        user_service,
        category_service,
        recipe_service,
        comment_service,
        image_repo,
        upload_config: Arc::new(config.upload.clone()),
        rate_limiter: rate_limiter.clone(),
    };

    // Background maintenance: expired sessions and rate limiter windows
    {
        let account_service = account_service.clone();
        let rate_limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                if let Err(e) = account_service.cleanup_expired_sessions().await {
                    tracing::warn!("Session cleanup failed: {}", e);
                }
                rate_limiter.cleanup().await;
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
