//! Comment repository
//!
//! Database operations for recipe comments.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Update a comment's content and rating
    async fn update(&self, comment: &Comment) -> Result<Comment>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;

    /// List comments on a recipe newest first, with author info
    async fn list_by_recipe(
        &self,
        recipe_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64)>;
}

/// SQLx-based comment repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_comment_sqlite(self.pool.as_sqlite().unwrap(), comment).await
            }
            DatabaseDriver::Mysql => {
                create_comment_mysql(self.pool.as_mysql().unwrap(), comment).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_comment_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_comment_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn update(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_comment_sqlite(self.pool.as_sqlite().unwrap(), comment).await
            }
            DatabaseDriver::Mysql => {
                update_comment_mysql(self.pool.as_mysql().unwrap(), comment).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_comment_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_comment_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_recipe(
        &self,
        recipe_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_recipe_sqlite(self.pool.as_sqlite().unwrap(), recipe_id, limit, offset)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_by_recipe_mysql(self.pool.as_mysql().unwrap(), recipe_id, limit, offset).await
            }
        }
    }
}

const LIST_BY_RECIPE_SQL: &str = r#"
    SELECT c.id, c.recipe_id, c.user_id, c.content, c.rating, c.published_at,
           u.username, u.usergroup
    FROM comments c
    INNER JOIN users u ON u.id = c.user_id
    WHERE c.recipe_id = ?
    ORDER BY c.published_at DESC, c.id DESC
    LIMIT ? OFFSET ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(
        r#"
        INSERT INTO comments (recipe_id, user_id, content, rating, published_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.recipe_id)
    .bind(comment.user_id)
    .bind(&comment.content)
    .bind(comment.rating)
    .bind(comment.published_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        ..comment.clone()
    })
}

async fn get_comment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, recipe_id, user_id, content, rating, published_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_comment_sqlite(&row))),
        None => Ok(None),
    }
}

async fn update_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    sqlx::query("UPDATE comments SET content = ?, rating = ? WHERE id = ?")
        .bind(&comment.content)
        .bind(comment.rating)
        .bind(comment.id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;

    get_comment_by_id_sqlite(pool, comment.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
}

async fn delete_comment_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

async fn list_by_recipe_sqlite(
    pool: &SqlitePool,
    recipe_id: i64,
    limit: i64,
    offset: i64,
) -> Result<(Vec<CommentWithAuthor>, i64)> {
    let rows = sqlx::query(LIST_BY_RECIPE_SQL)
        .bind(recipe_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let comments = rows
        .iter()
        .map(|row| CommentWithAuthor {
            id: row.get("id"),
            recipe_id: row.get("recipe_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            usergroup: row.get("usergroup"),
            content: row.get("content"),
            rating: row.get("rating"),
            published_at: row.get("published_at"),
        })
        .collect();

    let row = sqlx::query("SELECT COUNT(*) as count FROM comments WHERE recipe_id = ?")
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;
    let total: i64 = row.get("count");

    Ok((comments, total))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        recipe_id: row.get("recipe_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        rating: row.get("rating"),
        published_at: row.get("published_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(
        r#"
        INSERT INTO comments (recipe_id, user_id, content, rating, published_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.recipe_id)
    .bind(comment.user_id)
    .bind(&comment.content)
    .bind(comment.rating)
    .bind(comment.published_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        ..comment.clone()
    })
}

async fn get_comment_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, recipe_id, user_id, content, rating, published_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_comment_mysql(&row))),
        None => Ok(None),
    }
}

async fn update_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    sqlx::query("UPDATE comments SET content = ?, rating = ? WHERE id = ?")
        .bind(&comment.content)
        .bind(comment.rating)
        .bind(comment.id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;

    get_comment_by_id_mysql(pool, comment.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
}

async fn delete_comment_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

async fn list_by_recipe_mysql(
    pool: &MySqlPool,
    recipe_id: i64,
    limit: i64,
    offset: i64,
) -> Result<(Vec<CommentWithAuthor>, i64)> {
    let rows = sqlx::query(LIST_BY_RECIPE_SQL)
        .bind(recipe_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let comments = rows
        .iter()
        .map(|row| CommentWithAuthor {
            id: row.get("id"),
            recipe_id: row.get("recipe_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            usergroup: row.get("usergroup"),
            content: row.get("content"),
            rating: row.get("rating"),
            published_at: row.get("published_at"),
        })
        .collect();

    let row = sqlx::query("SELECT COUNT(*) as count FROM comments WHERE recipe_id = ?")
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;
    let total: i64 = row.get("count");

    Ok((comments, total))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        recipe_id: row.get("recipe_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        rating: row.get("rating"),
        published_at: row.get("published_at"),
    }
}
