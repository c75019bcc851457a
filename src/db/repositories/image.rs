//! Image repository
//!
//! Database operations for uploaded images.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Image;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Image repository trait
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Create a new image record
    async fn create(&self, image: &Image) -> Result<Image>;

    /// Get image by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Image>>;

    /// Get all images matching the given IDs
    ///
    /// Returns only the images that exist; callers compare lengths to
    /// detect dangling references.
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Image>>;
}

/// SQLx-based image repository implementation
pub struct SqlxImageRepository {
    pool: DynDatabasePool,
}

impl SqlxImageRepository {
    /// Create a new SQLx image repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ImageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ImageRepository for SqlxImageRepository {
    async fn create(&self, image: &Image) -> Result<Image> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_image_sqlite(self.pool.as_sqlite().unwrap(), image).await
            }
            DatabaseDriver::Mysql => create_image_mysql(self.pool.as_mysql().unwrap(), image).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Image>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_image_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_image_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Image>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_images_by_ids_sqlite(self.pool.as_sqlite().unwrap(), ids).await
            }
            DatabaseDriver::Mysql => {
                get_images_by_ids_mysql(self.pool.as_mysql().unwrap(), ids).await
            }
        }
    }
}

const IMAGE_COLUMNS: &str = "id, filename, url, size, content_type, created_at";

fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_image_sqlite(pool: &SqlitePool, image: &Image) -> Result<Image> {
    let result = sqlx::query(
        "INSERT INTO images (filename, url, size, content_type, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&image.filename)
    .bind(&image.url)
    .bind(image.size)
    .bind(&image.content_type)
    .bind(image.created_at)
    .execute(pool)
    .await
    .context("Failed to create image")?;

    Ok(Image {
        id: result.last_insert_rowid(),
        ..image.clone()
    })
}

async fn get_image_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Image>> {
    let row = sqlx::query(&format!("SELECT {} FROM images WHERE id = ?", IMAGE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get image by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_image_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_images_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Image>> {
    let query = format!(
        "SELECT {} FROM images WHERE id IN ({}) ORDER BY id",
        IMAGE_COLUMNS,
        in_placeholders(ids.len())
    );

    let mut q = sqlx::query(&query);
    for id in ids {
        q = q.bind(id);
    }

    let rows = q
        .fetch_all(pool)
        .await
        .context("Failed to get images by IDs")?;

    Ok(rows.iter().map(row_to_image_sqlite).collect())
}

fn row_to_image_sqlite(row: &sqlx::sqlite::SqliteRow) -> Image {
    Image {
        id: row.get("id"),
        filename: row.get("filename"),
        url: row.get("url"),
        size: row.get("size"),
        content_type: row.get("content_type"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_image_mysql(pool: &MySqlPool, image: &Image) -> Result<Image> {
    let result = sqlx::query(
        "INSERT INTO images (filename, url, size, content_type, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&image.filename)
    .bind(&image.url)
    .bind(image.size)
    .bind(&image.content_type)
    .bind(image.created_at)
    .execute(pool)
    .await
    .context("Failed to create image")?;

    Ok(Image {
        id: result.last_insert_id() as i64,
        ..image.clone()
    })
}

async fn get_image_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Image>> {
    let row = sqlx::query(&format!("SELECT {} FROM images WHERE id = ?", IMAGE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get image by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_image_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_images_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Image>> {
    let query = format!(
        "SELECT {} FROM images WHERE id IN ({}) ORDER BY id",
        IMAGE_COLUMNS,
        in_placeholders(ids.len())
    );

    let mut q = sqlx::query(&query);
    for id in ids {
        q = q.bind(id);
    }

    let rows = q
        .fetch_all(pool)
        .await
        .context("Failed to get images by IDs")?;

    Ok(rows.iter().map(row_to_image_mysql).collect())
}

fn row_to_image_mysql(row: &sqlx::mysql::MySqlRow) -> Image {
    Image {
        id: row.get("id"),
        filename: row.get("filename"),
        url: row.get("url"),
        size: row.get("size"),
        content_type: row.get("content_type"),
        created_at: row.get("created_at"),
    }
}
