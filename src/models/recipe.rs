//! Recipe model
//!
//! This module provides:
//! - `Recipe` entity with its category and optional author
//! - Input types for creating and updating recipes
//! - Pagination types (`ListParams`, `PagedResult`) shared by all list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recipe entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Recipe title
    pub title: String,
    /// Optional theme line shown under the title
    pub theme: Option<String>,
    /// Ingredient list as free text
    pub ingredients: String,
    /// Preparation instructions
    pub content: String,
    /// Category ID
    pub category_id: i64,
    /// Author user ID; null when the author account was deleted
    pub author_id: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Create a new recipe with the given parameters
    pub fn new(
        slug: String,
        title: String,
        theme: Option<String>,
        ingredients: String,
        content: String,
        category_id: i64,
        author_id: i64,
    ) -> Self {
        Self {
            id: 0, // Will be set by database
            slug,
            title,
            theme,
            ingredients,
            content,
            category_id,
            author_id: Some(author_id),
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a new recipe
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeInput {
    /// Recipe title; the slug is derived from it
    pub title: String,
    /// Optional theme line
    pub theme: Option<String>,
    /// Ingredient list
    pub ingredients: String,
    /// Preparation instructions
    pub content: String,
    /// Category ID
    pub category_id: i64,
    /// Previously uploaded image IDs to attach
    #[serde(default)]
    pub image_ids: Vec<i64>,
}

/// Input for updating an existing recipe
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecipeInput {
    /// New title (optional; regenerates the slug)
    pub title: Option<String>,
    /// New theme (optional; `Some(None)` clears it)
    pub theme: Option<Option<String>>,
    /// New ingredient list (optional)
    pub ingredients: Option<String>,
    /// New instructions (optional)
    pub content: Option<String>,
    /// New category ID (optional)
    pub category_id: Option<i64>,
    /// Replacement image IDs (optional)
    pub image_ids: Option<Vec<i64>>,
}

impl UpdateRecipeInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.theme.is_some()
            || self.ingredients.is_some()
            || self.content.is_some()
            || self.category_id.is_some()
            || self.image_ids.is_some()
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    ///
    /// Widened to i64 before multiplying so an extreme page number from
    /// the query string cannot overflow.
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1)) as i64 * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Map the items while keeping the pagination envelope
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}
