//! Recipe repository
//!
//! Database operations for recipes and their image attachments.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Image, Recipe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Create a new recipe
    async fn create(&self, recipe: &Recipe) -> Result<Recipe>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// Get recipe by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Recipe>>;

    /// Check whether a slug is already taken
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Update a recipe
    async fn update(&self, recipe: &Recipe) -> Result<Recipe>;

    /// Delete a recipe
    async fn delete(&self, id: i64) -> Result<()>;

    /// List recipes newest first, optionally filtered by category
    async fn list(
        &self,
        category_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64)>;

    /// Replace the set of images attached to a recipe
    async fn set_images(&self, recipe_id: i64, image_ids: &[i64]) -> Result<()>;

    /// Get the images attached to a recipe
    async fn get_images(&self, recipe_id: i64) -> Result<Vec<Image>>;
}

/// SQLx-based recipe repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, recipe: &Recipe) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_recipe_sqlite(self.pool.as_sqlite().unwrap(), recipe).await
            }
            DatabaseDriver::Mysql => {
                create_recipe_mysql(self.pool.as_mysql().unwrap(), recipe).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_recipe_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_recipe_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_recipe_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_recipe_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }

    async fn update(&self, recipe: &Recipe) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_recipe_sqlite(self.pool.as_sqlite().unwrap(), recipe).await
            }
            DatabaseDriver::Mysql => {
                update_recipe_mysql(self.pool.as_mysql().unwrap(), recipe).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_recipe_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_recipe_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(
        &self,
        category_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_recipes_sqlite(self.pool.as_sqlite().unwrap(), category_id, limit, offset)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_recipes_mysql(self.pool.as_mysql().unwrap(), category_id, limit, offset).await
            }
        }
    }

    async fn set_images(&self, recipe_id: i64, image_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_images_sqlite(self.pool.as_sqlite().unwrap(), recipe_id, image_ids).await
            }
            DatabaseDriver::Mysql => {
                set_images_mysql(self.pool.as_mysql().unwrap(), recipe_id, image_ids).await
            }
        }
    }

    async fn get_images(&self, recipe_id: i64) -> Result<Vec<Image>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_images_sqlite(self.pool.as_sqlite().unwrap(), recipe_id).await
            }
            DatabaseDriver::Mysql => {
                get_images_mysql(self.pool.as_mysql().unwrap(), recipe_id).await
            }
        }
    }
}

const RECIPE_COLUMNS: &str =
    "id, slug, title, theme, ingredients, content, category_id, author_id, created_at";

const RECIPE_IMAGES_SQL: &str = r#"
    SELECT i.id, i.filename, i.url, i.size, i.content_type, i.created_at
    FROM images i
    INNER JOIN recipe_images ri ON ri.image_id = i.id
    WHERE ri.recipe_id = ?
    ORDER BY i.id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, recipe: &Recipe) -> Result<Recipe> {
    let result = sqlx::query(
        r#"
        INSERT INTO recipes (slug, title, theme, ingredients, content, category_id, author_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recipe.slug)
    .bind(&recipe.title)
    .bind(&recipe.theme)
    .bind(&recipe.ingredients)
    .bind(&recipe.content)
    .bind(recipe.category_id)
    .bind(recipe.author_id)
    .bind(recipe.created_at)
    .execute(pool)
    .await
    .context("Failed to create recipe")?;

    Ok(Recipe {
        id: result.last_insert_rowid(),
        ..recipe.clone()
    })
}

async fn get_recipe_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Recipe>> {
    let query = format!("SELECT {} FROM recipes WHERE id = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_recipe_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_recipe_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Recipe>> {
    let query = format!("SELECT {} FROM recipes WHERE slug = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_recipe_sqlite(&row))),
        None => Ok(None),
    }
}

async fn update_recipe_sqlite(pool: &SqlitePool, recipe: &Recipe) -> Result<Recipe> {
    sqlx::query(
        r#"
        UPDATE recipes
        SET slug = ?, title = ?, theme = ?, ingredients = ?, content = ?, category_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&recipe.slug)
    .bind(&recipe.title)
    .bind(&recipe.theme)
    .bind(&recipe.ingredients)
    .bind(&recipe.content)
    .bind(recipe.category_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .context("Failed to update recipe")?;

    get_recipe_by_id_sqlite(pool, recipe.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after update"))
}

async fn delete_recipe_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete recipe")?;

    Ok(())
}

async fn list_recipes_sqlite(
    pool: &SqlitePool,
    category_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Recipe>, i64)> {
    let (query, count_query) = match category_id {
        Some(_) => (
            format!(
                "SELECT {} FROM recipes WHERE category_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                RECIPE_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM recipes WHERE category_id = ?".to_string(),
        ),
        None => (
            format!(
                "SELECT {} FROM recipes ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                RECIPE_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM recipes".to_string(),
        ),
    };

    let mut list_query = sqlx::query(&query);
    if let Some(cid) = category_id {
        list_query = list_query.bind(cid);
    }
    let rows = list_query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let recipes = rows.iter().map(row_to_recipe_sqlite).collect();

    let mut total_query = sqlx::query(&count_query);
    if let Some(cid) = category_id {
        total_query = total_query.bind(cid);
    }
    let row = total_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?;
    let total: i64 = row.get("count");

    Ok((recipes, total))
}

async fn set_images_sqlite(pool: &SqlitePool, recipe_id: i64, image_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM recipe_images WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe images")?;

    for image_id in image_ids {
        sqlx::query("INSERT INTO recipe_images (recipe_id, image_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(image_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach image to recipe")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

async fn get_images_sqlite(pool: &SqlitePool, recipe_id: i64) -> Result<Vec<Image>> {
    let rows = sqlx::query(RECIPE_IMAGES_SQL)
        .bind(recipe_id)
        .fetch_all(pool)
        .await
        .context("Failed to get recipe images")?;

    Ok(rows
        .iter()
        .map(|row| Image {
            id: row.get("id"),
            filename: row.get("filename"),
            url: row.get("url"),
            size: row.get("size"),
            content_type: row.get("content_type"),
            created_at: row.get("created_at"),
        })
        .collect())
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        theme: row.get("theme"),
        ingredients: row.get("ingredients"),
        content: row.get("content"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, recipe: &Recipe) -> Result<Recipe> {
    let result = sqlx::query(
        r#"
        INSERT INTO recipes (slug, title, theme, ingredients, content, category_id, author_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recipe.slug)
    .bind(&recipe.title)
    .bind(&recipe.theme)
    .bind(&recipe.ingredients)
    .bind(&recipe.content)
    .bind(recipe.category_id)
    .bind(recipe.author_id)
    .bind(recipe.created_at)
    .execute(pool)
    .await
    .context("Failed to create recipe")?;

    Ok(Recipe {
        id: result.last_insert_id() as i64,
        ..recipe.clone()
    })
}

async fn get_recipe_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Recipe>> {
    let query = format!("SELECT {} FROM recipes WHERE id = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_recipe_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_recipe_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Recipe>> {
    let query = format!("SELECT {} FROM recipes WHERE slug = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_recipe_mysql(&row))),
        None => Ok(None),
    }
}

async fn update_recipe_mysql(pool: &MySqlPool, recipe: &Recipe) -> Result<Recipe> {
    sqlx::query(
        r#"
        UPDATE recipes
        SET slug = ?, title = ?, theme = ?, ingredients = ?, content = ?, category_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&recipe.slug)
    .bind(&recipe.title)
    .bind(&recipe.theme)
    .bind(&recipe.ingredients)
    .bind(&recipe.content)
    .bind(recipe.category_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .context("Failed to update recipe")?;

    get_recipe_by_id_mysql(pool, recipe.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after update"))
}

async fn delete_recipe_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete recipe")?;

    Ok(())
}

async fn list_recipes_mysql(
    pool: &MySqlPool,
    category_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Recipe>, i64)> {
    let (query, count_query) = match category_id {
        Some(_) => (
            format!(
                "SELECT {} FROM recipes WHERE category_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                RECIPE_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM recipes WHERE category_id = ?".to_string(),
        ),
        None => (
            format!(
                "SELECT {} FROM recipes ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                RECIPE_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM recipes".to_string(),
        ),
    };

    let mut list_query = sqlx::query(&query);
    if let Some(cid) = category_id {
        list_query = list_query.bind(cid);
    }
    let rows = list_query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let recipes = rows.iter().map(row_to_recipe_mysql).collect();

    let mut total_query = sqlx::query(&count_query);
    if let Some(cid) = category_id {
        total_query = total_query.bind(cid);
    }
    let row = total_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?;
    let total: i64 = row.get("count");

    Ok((recipes, total))
}

async fn set_images_mysql(pool: &MySqlPool, recipe_id: i64, image_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM recipe_images WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe images")?;

    for image_id in image_ids {
        sqlx::query("INSERT INTO recipe_images (recipe_id, image_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(image_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach image to recipe")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

async fn get_images_mysql(pool: &MySqlPool, recipe_id: i64) -> Result<Vec<Image>> {
    let rows = sqlx::query(RECIPE_IMAGES_SQL)
        .bind(recipe_id)
        .fetch_all(pool)
        .await
        .context("Failed to get recipe images")?;

    Ok(rows
        .iter()
        .map(|row| Image {
            id: row.get("id"),
            filename: row.get("filename"),
            url: row.get("url"),
            size: row.get("size"),
            content_type: row.get("content_type"),
            created_at: row.get("created_at"),
        })
        .collect())
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        theme: row.get("theme"),
        ingredients: row.get("ingredients"),
        content: row.get("content"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }
}
