//! Category service
//!
//! Categories are flat: a name, a slug derived from it, and the recipes
//! that reference it. Deletion is refused while recipes still point at
//! the category.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryWithCount, CreateCategoryInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for category operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Category name or slug already exists
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    /// Category not found
    #[error("Category not found")]
    NotFound,

    /// Category still has recipes
    #[error("Category is not empty: {0} recipes still reference it")]
    NotEmpty(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    category_repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(category_repo: Arc<dyn CategoryRepository>) -> Self {
        Self { category_repo }
    }

    /// List all categories with their recipe counts
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        let categories = self
            .category_repo
            .list_with_counts()
            .await
            .context("Failed to list categories")?;

        Ok(categories)
    }

    /// Get a category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        let category = self
            .category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?;

        Ok(category)
    }

    /// Create a new category
    ///
    /// The slug is derived from the name. Duplicate names or slugs are
    /// refused rather than de-duplicated: categories are curated by
    /// admins and a collision means two names that would be
    /// indistinguishable in a URL.
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = input.name.trim().to_string();
        let name_len = name.chars().count();
        if !(2..=60).contains(&name_len) {
            return Err(CategoryServiceError::ValidationError(
                "Category name must be between 2 and 60 characters".to_string(),
            ));
        }

        let slug = generate_slug(&name);
        if slug.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name does not produce a usable slug".to_string(),
            ));
        }

        if self
            .category_repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check slug")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateCategory(name));
        }

        let category = Category::new(slug, name);

        let created = self
            .category_repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        Ok(created)
    }

    /// Delete a category
    ///
    /// Refused while any recipe still references it.
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound)?;

        let count = self
            .category_repo
            .recipe_count(category.id)
            .await
            .context("Failed to count recipes")?;

        if count > 0 {
            return Err(CategoryServiceError::NotEmpty(count));
        }

        self.category_repo
            .delete(category.id)
            .await
            .context("Failed to delete category")?;

        Ok(())
    }
}

/// Generate a URL-friendly slug from a category name
///
/// Lowercases the name, maps spaces and ASCII punctuation to hyphens,
/// keeps non-ASCII characters, and collapses hyphen runs.
pub fn generate_slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if c == ' ' || c == '_' || c == '-' {
                '-'
            } else if !c.is_ascii() {
                // Keep non-ASCII characters so non-English names stay readable
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, CategoryService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let service = CategoryService::new(category_repo);

        (pool, service)
    }

    #[tokio::test]
    async fn test_create_category_derives_slug() {
        let (_pool, service) = setup_test_service().await;

        let category = service
            .create(CreateCategoryInput {
                name: "Week Night Dinners".to_string(),
            })
            .await
            .expect("Failed to create category");

        assert_eq!(category.slug, "week-night-dinners");
        assert_eq!(category.name, "Week Night Dinners");
    }

    #[tokio::test]
    async fn test_create_duplicate_name_fails() {
        let (_pool, service) = setup_test_service().await;

        service
            .create(CreateCategoryInput {
                name: "Desserts".to_string(),
            })
            .await
            .expect("Failed to create category");

        let result = service
            .create(CreateCategoryInput {
                name: "Desserts".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(CategoryServiceError::DuplicateCategory(_))
        ));
    }

    #[tokio::test]
    async fn test_create_colliding_slug_fails() {
        let (_pool, service) = setup_test_service().await;

        service
            .create(CreateCategoryInput {
                name: "Quick Meals".to_string(),
            })
            .await
            .expect("Failed to create category");

        // Different name, same slug
        let result = service
            .create(CreateCategoryInput {
                name: "quick meals".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(CategoryServiceError::DuplicateCategory(_))
        ));
    }

    #[tokio::test]
    async fn test_create_too_short_name_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .create(CreateCategoryInput {
                name: "A".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(CategoryServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_empty_category() {
        let (_pool, service) = setup_test_service().await;

        let category = service
            .create(CreateCategoryInput {
                name: "Short Lived".to_string(),
            })
            .await
            .expect("Failed to create category");

        service.delete(category.id).await.expect("Failed to delete");
        assert!(service.get_by_slug("short-lived").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_category_with_recipes_refused() {
        let (pool, service) = setup_test_service().await;

        let category = service
            .create(CreateCategoryInput {
                name: "Occupied".to_string(),
            })
            .await
            .expect("Failed to create category");

        sqlx::query(
            "INSERT INTO recipes (slug, title, ingredients, content, category_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("pasta")
        .bind("Pasta")
        .bind("pasta, sauce")
        .bind("Boil the pasta, warm the sauce, combine and serve.")
        .bind(category.id)
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert recipe");

        let result = service.delete(category.id).await;
        assert!(matches!(result, Err(CategoryServiceError::NotEmpty(1))));
    }

    #[tokio::test]
    async fn test_delete_missing_category() {
        let (_pool, service) = setup_test_service().await;

        let result = service.delete(42).await;
        assert!(matches!(result, Err(CategoryServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_with_counts() {
        let (_pool, service) = setup_test_service().await;

        service
            .create(CreateCategoryInput {
                name: "Breakfast".to_string(),
            })
            .await
            .expect("Failed to create category");

        let listed = service.list_with_counts().await.expect("Failed to list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].recipe_count, 0);
    }

    #[test]
    fn test_generate_slug_basic() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
    }

    #[test]
    fn test_generate_slug_collapses_punctuation() {
        assert_eq!(generate_slug("Soups & Stews!"), "soups-stews");
    }

    #[test]
    fn test_generate_slug_keeps_non_ascii() {
        assert_eq!(generate_slug("Pâtisserie"), "pâtisserie");
    }
}
