//! Category repository
//!
//! Database operations for recipe categories.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories with their recipe counts
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>>;

    /// Count recipes referencing a category
    async fn recipe_count(&self, category_id: i64) -> Result<i64>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_categories_with_counts_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                list_categories_with_counts_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }

    async fn recipe_count(&self, category_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                recipe_count_sqlite(self.pool.as_sqlite().unwrap(), category_id).await
            }
            DatabaseDriver::Mysql => {
                recipe_count_mysql(self.pool.as_mysql().unwrap(), category_id).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const LIST_WITH_COUNTS_SQL: &str = r#"
    SELECT c.id, c.slug, c.name, c.created_at, COUNT(r.id) as recipe_count
    FROM categories c
    LEFT JOIN recipes r ON r.category_id = c.id
    GROUP BY c.id, c.slug, c.name, c.created_at
    ORDER BY c.name
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let result = sqlx::query(
        r#"
        INSERT INTO categories (slug, name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(category.created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        ..category.clone()
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_categories_with_counts_sqlite(pool: &SqlitePool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(LIST_WITH_COUNTS_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows
        .iter()
        .map(|row| CategoryWithCount {
            category: row_to_category_sqlite(row),
            recipe_count: row.get("recipe_count"),
        })
        .collect())
}

async fn recipe_count_sqlite(pool: &SqlitePool, category_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM recipes WHERE category_id = ?")
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("Failed to count recipes in category")?;

    Ok(row.get("count"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let result = sqlx::query(
        r#"
        INSERT INTO categories (slug, name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&category.slug)
    .bind(&category.name)
    .bind(category.created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        ..category.clone()
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, slug, name, created_at FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_categories_with_counts_mysql(pool: &MySqlPool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(LIST_WITH_COUNTS_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows
        .iter()
        .map(|row| CategoryWithCount {
            category: row_to_category_mysql(row),
            recipe_count: row.get("recipe_count"),
        })
        .collect())
}

async fn recipe_count_mysql(pool: &MySqlPool, category_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM recipes WHERE category_id = ?")
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("Failed to count recipes in category")?;

    Ok(row.get("count"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_category() {
        let (_pool, repo) = setup_test_repo().await;
        let category = Category::new("desserts".to_string(), "Desserts".to_string());

        let created = repo.create(&category).await.expect("Failed to create category");

        assert!(created.id > 0);
        assert_eq!(created.slug, "desserts");
        assert_eq!(created.name, "Desserts");
    }

    #[tokio::test]
    async fn test_get_category_by_slug() {
        let (_pool, repo) = setup_test_repo().await;
        let category = Category::new("mains".to_string(), "Mains".to_string());
        repo.create(&category).await.expect("Failed to create category");

        let found = repo
            .get_by_slug("mains")
            .await
            .expect("Failed to get category")
            .expect("Category not found");
        assert_eq!(found.name, "Mains");

        let missing = repo.get_by_slug("missing").await.expect("Failed to get");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unique_name_constraint() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Category::new("soups".to_string(), "Soups".to_string()))
            .await
            .expect("Failed to create category");

        let result = repo
            .create(&Category::new("soups-2".to_string(), "Soups".to_string()))
            .await;

        assert!(result.is_err(), "Should fail due to duplicate name");
    }

    #[tokio::test]
    async fn test_list_with_counts_empty_category() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Category::new("starters".to_string(), "Starters".to_string()))
            .await
            .expect("Failed to create category");

        let categories = repo.list_with_counts().await.expect("Failed to list");

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].recipe_count, 0);
    }

    #[tokio::test]
    async fn test_delete_category() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&Category::new("gone".to_string(), "Gone".to_string()))
            .await
            .expect("Failed to create category");

        repo.delete(created.id).await.expect("Failed to delete");

        let found = repo.get_by_id(created.id).await.expect("Failed to get");
        assert!(found.is_none());
    }
}
