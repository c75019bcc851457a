//! Category model
//!
//! Categories group recipes; each recipe belongs to exactly one category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Category name (unique)
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new Category with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(slug: String, name: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            slug,
            name,
            created_at: Utc::now(),
        }
    }
}

/// Category with the number of recipes it contains, for listing responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithCount {
    /// The category itself
    #[serde(flatten)]
    pub category: Category,
    /// Number of recipes in the category
    pub recipe_count: i64,
}

/// Input for creating a new category
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    /// Category name; the slug is derived from it
    pub name: String,
}
