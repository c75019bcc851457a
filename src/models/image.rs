//! Image model
//!
//! Uploaded images are stored on disk under the upload directory and
//! recorded in the `images` table; recipes reference them through the
//! `recipe_images` join table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Unique identifier
    pub id: i64,
    /// Stored filename (`{uuid}.{ext}`)
    pub filename: String,
    /// Public URL under `/uploads`
    pub url: String,
    /// File size in bytes
    pub size: i64,
    /// MIME type
    pub content_type: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Create a new image record with the given parameters
    pub fn new(filename: String, url: String, size: i64, content_type: String) -> Self {
        Self {
            id: 0, // Will be set by database
            filename,
            url,
            size,
            content_type,
            created_at: Utc::now(),
        }
    }
}
