//! Development fixtures
//!
//! Populates an empty database with one account per role, a category,
//! and a few recipes with comments. Running it against a database that
//! already has users is a no-op, so `--seed` is safe to repeat.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use crate::db::repositories::{
    CategoryRepository, CommentRepository, RecipeRepository, SqlxCategoryRepository,
    SqlxCommentRepository, SqlxRecipeRepository, SqlxUserRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Category, Comment, Recipe, Role, User};
use crate::services::password::hash_password;

/// Password shared by all seeded accounts
const SEED_PASSWORD: &str = "Qwerty0000";

/// Seed the database with development fixtures
pub async fn run(pool: DynDatabasePool) -> Result<()> {
    let user_repo = SqlxUserRepository::new(pool.clone());
    let category_repo = SqlxCategoryRepository::new(pool.clone());
    let recipe_repo = SqlxRecipeRepository::new(pool.clone());
    let comment_repo = SqlxCommentRepository::new(pool);

    if user_repo.count().await.context("Failed to count users")? > 0 {
        tracing::info!("Database already contains users, skipping seed");
        return Ok(());
    }

    tracing::info!("Seeding database with development fixtures");

    let password_hash = hash_password(SEED_PASSWORD).context("Failed to hash seed password")?;

    let roles = [
        ("subscriber", Role::Subscriber),
        ("writer", Role::Writer),
        ("editor", Role::Editor),
        ("admin", Role::Admin),
        ("superadmin", Role::Superadmin),
    ];

    let mut users = Vec::with_capacity(roles.len());
    for (username, role) in roles {
        let mut user = User::new(
            format!("{} kitchen", username),
            username.to_string(),
            format!("{}@cocotte.local", username),
            password_hash.clone(),
            String::new(),
        );
        user.role = role;
        user.enabled = true;
        user.confirmation_token = None;

        let created = user_repo
            .create(&user)
            .await
            .with_context(|| format!("Failed to seed user '{}'", username))?;
        users.push(created);
    }

    let category = category_repo
        .create(&Category::new("desserts".to_string(), "Desserts".to_string()))
        .await
        .context("Failed to seed category")?;

    let recipes = [
        (
            "tarte-tatin",
            "Tarte Tatin",
            Some("An upside-down classic"),
            "6 apples, 150g sugar, 100g butter, 1 sheet puff pastry",
            "Caramelize the sugar and butter in an ovenproof pan. Arrange the apple halves, cover with pastry, and bake until golden. Flip while warm.",
        ),
        (
            "chocolate-mousse",
            "Chocolate Mousse",
            None,
            "200g dark chocolate, 6 eggs, pinch of salt",
            "Melt the chocolate, separate the eggs, fold the whipped whites into the yolk mixture, and chill for four hours before serving.",
        ),
        (
            "creme-brulee",
            "Creme Brulee",
            Some("Crack the top"),
            "500ml cream, 6 egg yolks, 100g sugar, 1 vanilla pod",
            "Infuse the cream with vanilla, whisk into the yolks and sugar, bake in a water bath, then caramelize the tops with a torch.",
        ),
    ];

    // Recipes rotate through the accounts that can write
    let authors = [&users[1], &users[2], &users[3]];

    let mut seeded_recipes = Vec::with_capacity(recipes.len());
    for (i, (slug, title, theme, ingredients, content)) in recipes.into_iter().enumerate() {
        let recipe = Recipe::new(
            slug.to_string(),
            title.to_string(),
            theme.map(|t| t.to_string()),
            ingredients.to_string(),
            content.to_string(),
            category.id,
            authors[i % authors.len()].id,
        );

        let created = recipe_repo
            .create(&recipe)
            .await
            .with_context(|| format!("Failed to seed recipe '{}'", slug))?;
        seeded_recipes.push(created);
    }

    let remarks = [
        "Made this last weekend, came out perfectly.",
        "A bit too sweet for my taste, halved the sugar.",
        "The family asked for seconds.",
        "Clear instructions, worked on the first try.",
        "Swapped the butter for margarine, still great.",
        "Took longer than expected but worth it.",
        "This one is going in the rotation.",
        "Needed ten more minutes in my oven.",
        "Exactly like my grandmother used to make.",
        "Solid base recipe, easy to adapt.",
    ];

    let mut comment_count = 0;
    for (i, recipe) in seeded_recipes.iter().enumerate() {
        // Between 1 and 10 comments per recipe, staggered into the past
        let n = (i * 7) % 10 + 1;
        for j in 0..n {
            let commenter = &users[j % users.len()];
            let rating = match j % 3 {
                0 => Some((j % 5 + 1) as i32),
                _ => None,
            };

            let comment = Comment {
                id: 0,
                recipe_id: recipe.id,
                user_id: commenter.id,
                content: remarks[(i + j) % remarks.len()].to_string(),
                rating,
                published_at: Utc::now() - Duration::hours((n - j) as i64),
            };

            comment_repo
                .create(&comment)
                .await
                .context("Failed to seed comment")?;
            comment_count += 1;
        }
    }

    tracing::info!(
        "Seeded {} users, 1 category, {} recipes, {} comments",
        users.len(),
        seeded_recipes.len(),
        comment_count
    );
    tracing::info!("All seeded accounts use the password '{}'", SEED_PASSWORD);

    Ok(())
}
