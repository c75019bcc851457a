//! Recipe service
//!
//! Creation, editing, listing, and deletion of recipes. Slugs are
//! derived from the title and de-duplicated with a numeric suffix.
//! Edit rights: editors and above, or the author; delete rights:
//! admins and above, or the author.

use crate::db::repositories::{CategoryRepository, ImageRepository, RecipeRepository};
use crate::models::{
    CreateRecipeInput, Image, ListParams, PagedResult, Recipe, UpdateRecipeInput, User,
};
use anyhow::Context;
use std::sync::Arc;

/// Minimum length of the instructions text
const MIN_CONTENT_LENGTH: usize = 20;

/// Error types for recipe operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    /// Caller is not allowed to perform this operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Recipe not found
    #[error("Recipe not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Recipe service
pub struct RecipeService {
    recipe_repo: Arc<dyn RecipeRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    image_repo: Arc<dyn ImageRepository>,
}

impl RecipeService {
    /// Create a new recipe service
    pub fn new(
        recipe_repo: Arc<dyn RecipeRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        image_repo: Arc<dyn ImageRepository>,
    ) -> Self {
        Self {
            recipe_repo,
            category_repo,
            image_repo,
        }
    }

    /// Paginated recipe listing, newest first
    ///
    /// `category_id` narrows the listing to one category.
    pub async fn list(
        &self,
        category_id: Option<i64>,
        params: &ListParams,
    ) -> Result<PagedResult<Recipe>, RecipeServiceError> {
        let (recipes, total) = self
            .recipe_repo
            .list(category_id, params.limit(), params.offset())
            .await
            .context("Failed to list recipes")?;

        Ok(PagedResult::new(recipes, total, params))
    }

    /// Get a recipe by slug, with its attached images
    pub async fn get_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<(Recipe, Vec<Image>)>, RecipeServiceError> {
        let recipe = match self
            .recipe_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get recipe by slug")?
        {
            Some(recipe) => recipe,
            None => return Ok(None),
        };

        let images = self
            .recipe_repo
            .get_images(recipe.id)
            .await
            .context("Failed to get recipe images")?;

        Ok(Some((recipe, images)))
    }

    /// Get a recipe by slug without loading its images
    pub async fn resolve_slug(&self, slug: &str) -> Result<Option<Recipe>, RecipeServiceError> {
        let recipe = self
            .recipe_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get recipe by slug")?;

        Ok(recipe)
    }

    /// Get a recipe by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>, RecipeServiceError> {
        let recipe = self
            .recipe_repo
            .get_by_id(id)
            .await
            .context("Failed to get recipe by ID")?;

        Ok(recipe)
    }

    /// Create a new recipe
    ///
    /// The route layer has already checked for the writer role; the
    /// author is recorded from the session user.
    pub async fn create(
        &self,
        author: &User,
        input: CreateRecipeInput,
    ) -> Result<Recipe, RecipeServiceError> {
        validate_title(&input.title)?;
        validate_theme(input.theme.as_deref())?;
        validate_ingredients(&input.ingredients)?;
        validate_content(&input.content)?;

        self.ensure_category_exists(input.category_id).await?;
        self.ensure_images_exist(&input.image_ids).await?;

        let slug = self.unique_slug(&input.title, None).await?;

        let recipe = Recipe::new(
            slug,
            input.title.trim().to_string(),
            input.theme.map(|t| t.trim().to_string()),
            input.ingredients,
            input.content,
            input.category_id,
            author.id,
        );

        let created = self
            .recipe_repo
            .create(&recipe)
            .await
            .context("Failed to create recipe")?;

        if !input.image_ids.is_empty() {
            self.recipe_repo
                .set_images(created.id, &input.image_ids)
                .await
                .context("Failed to attach images")?;
        }

        Ok(created)
    }

    /// Update a recipe
    ///
    /// Editors may edit any recipe; writers only their own. A title
    /// change regenerates the slug.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateRecipeInput,
    ) -> Result<Recipe, RecipeServiceError> {
        let mut recipe = self
            .recipe_repo
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or(RecipeServiceError::NotFound)?;

        if !actor.can_edit_recipe(recipe.author_id) {
            return Err(RecipeServiceError::Forbidden(
                "You are not allowed to edit this recipe".to_string(),
            ));
        }

        if !input.has_changes() {
            return Ok(recipe);
        }

        if let Some(ref title) = input.title {
            validate_title(title)?;
            recipe.slug = self.unique_slug(title, Some(recipe.id)).await?;
            recipe.title = title.trim().to_string();
        }

        if let Some(theme) = input.theme {
            validate_theme(theme.as_deref())?;
            recipe.theme = theme.map(|t| t.trim().to_string());
        }

        if let Some(ingredients) = input.ingredients {
            validate_ingredients(&ingredients)?;
            recipe.ingredients = ingredients;
        }

        if let Some(content) = input.content {
            validate_content(&content)?;
            recipe.content = content;
        }

        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
            recipe.category_id = category_id;
        }

        let updated = self
            .recipe_repo
            .update(&recipe)
            .await
            .context("Failed to update recipe")?;

        if let Some(ref image_ids) = input.image_ids {
            self.ensure_images_exist(image_ids).await?;
            self.recipe_repo
                .set_images(updated.id, image_ids)
                .await
                .context("Failed to replace images")?;
        }

        Ok(updated)
    }

    /// Delete a recipe
    ///
    /// Admins may delete any recipe; everyone else only their own.
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), RecipeServiceError> {
        let recipe = self
            .recipe_repo
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or(RecipeServiceError::NotFound)?;

        if !actor.can_delete_recipe(recipe.author_id) {
            return Err(RecipeServiceError::Forbidden(
                "You are not allowed to delete this recipe".to_string(),
            ));
        }

        self.recipe_repo
            .delete(id)
            .await
            .context("Failed to delete recipe")?;

        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn ensure_category_exists(&self, category_id: i64) -> Result<(), RecipeServiceError> {
        if self
            .category_repo
            .get_by_id(category_id)
            .await
            .context("Failed to check category")?
            .is_none()
        {
            return Err(RecipeServiceError::ValidationError(
                "Unknown category".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_images_exist(&self, image_ids: &[i64]) -> Result<(), RecipeServiceError> {
        if image_ids.is_empty() {
            return Ok(());
        }

        let found = self
            .image_repo
            .get_by_ids(image_ids)
            .await
            .context("Failed to check images")?;

        if found.len() != image_ids.len() {
            return Err(RecipeServiceError::ValidationError(
                "One or more image IDs do not exist".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive a slug from the title, appending `-2`, `-3`, ... until it
    /// is free. `exclude_id` lets an update keep its own slug.
    async fn unique_slug(
        &self,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, RecipeServiceError> {
        let base = crate::services::category::generate_slug(title);
        if base.is_empty() {
            return Err(RecipeServiceError::ValidationError(
                "Title does not produce a usable slug".to_string(),
            ));
        }

        let mut candidate = base.clone();
        let mut suffix = 2;

        loop {
            let taken = match self
                .recipe_repo
                .get_by_slug(&candidate)
                .await
                .context("Failed to check slug")?
            {
                Some(existing) => Some(existing.id) != exclude_id,
                None => false,
            };

            if !taken {
                return Ok(candidate);
            }

            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
    }
}

fn validate_title(title: &str) -> Result<(), RecipeServiceError> {
    let len = title.trim().chars().count();
    if !(3..=60).contains(&len) {
        return Err(RecipeServiceError::ValidationError(
            "Title must be between 3 and 60 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_theme(theme: Option<&str>) -> Result<(), RecipeServiceError> {
    if let Some(theme) = theme {
        let len = theme.trim().chars().count();
        if !(3..=60).contains(&len) {
            return Err(RecipeServiceError::ValidationError(
                "Theme must be between 3 and 60 characters".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_ingredients(ingredients: &str) -> Result<(), RecipeServiceError> {
    if ingredients.trim().is_empty() {
        return Err(RecipeServiceError::ValidationError(
            "Ingredients cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), RecipeServiceError> {
    if content.trim().chars().count() < MIN_CONTENT_LENGTH {
        return Err(RecipeServiceError::ValidationError(format!(
            "Instructions must be at least {} characters",
            MIN_CONTENT_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ImageRepository, SqlxCategoryRepository, SqlxImageRepository, SqlxRecipeRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{Category, Role};

    async fn setup_test_service() -> (DynDatabasePool, RecipeService, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let category = category_repo
            .create(&Category::new("mains".to_string(), "Mains".to_string()))
            .await
            .expect("Failed to create category");

        sqlx::query(
            "INSERT INTO users (usergroup, username, email, password_hash, enabled) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("Test Kitchen")
        .bind("author")
        .bind("author@example.com")
        .bind("hash")
        .bind(true)
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to create user");

        let service = RecipeService::new(
            SqlxRecipeRepository::boxed(pool.clone()),
            category_repo,
            SqlxImageRepository::boxed(pool.clone()),
        );

        (pool, service, category.id)
    }

    fn test_user(id: i64, role: Role) -> User {
        let mut user = User::new(
            "Test Kitchen".to_string(),
            format!("user{}", id),
            format!("user{}@example.com", id),
            "hash".to_string(),
            "token".to_string(),
        );
        user.id = id;
        user.role = role;
        user.enabled = true;
        user
    }

    fn create_input(title: &str, category_id: i64) -> CreateRecipeInput {
        CreateRecipeInput {
            title: title.to_string(),
            theme: None,
            ingredients: "flour, water, salt".to_string(),
            content: "Mix everything and bake until golden brown.".to_string(),
            category_id,
            image_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_recipe_derives_slug() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let recipe = service
            .create(&author, create_input("Sourdough Bread", category_id))
            .await
            .expect("Failed to create recipe");

        assert_eq!(recipe.slug, "sourdough-bread");
        assert_eq!(recipe.author_id, Some(1));
    }

    #[tokio::test]
    async fn test_create_duplicate_title_gets_suffix() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let first = service
            .create(&author, create_input("Pancakes", category_id))
            .await
            .expect("Failed to create first recipe");
        let second = service
            .create(&author, create_input("Pancakes", category_id))
            .await
            .expect("Failed to create second recipe");
        let third = service
            .create(&author, create_input("Pancakes", category_id))
            .await
            .expect("Failed to create third recipe");

        assert_eq!(first.slug, "pancakes");
        assert_eq!(second.slug, "pancakes-2");
        assert_eq!(third.slug, "pancakes-3");
    }

    #[tokio::test]
    async fn test_create_validates_title_length() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let result = service.create(&author, create_input("Ab", category_id)).await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_validates_content_length() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let mut input = create_input("Toast", category_id);
        input.content = "Too short".to_string();

        let result = service.create(&author, input).await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_validates_theme_length() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let mut input = create_input("Toast", category_id);
        input.theme = Some("ab".to_string());

        let result = service.create(&author, input).await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_unknown_category_fails() {
        let (_pool, service, _category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let result = service.create(&author, create_input("Toast", 999)).await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_unknown_image_fails() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let mut input = create_input("Toast With Photos", category_id);
        input.image_ids = vec![999];

        let result = service.create(&author, input).await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_writer_edits_own_recipe() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let recipe = service
            .create(&author, create_input("Omelette", category_id))
            .await
            .expect("Failed to create recipe");

        let updated = service
            .update(
                &author,
                recipe.id,
                UpdateRecipeInput {
                    ingredients: Some("eggs, butter, chives".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update recipe");

        assert_eq!(updated.ingredients, "eggs, butter, chives");
    }

    #[tokio::test]
    async fn test_writer_cannot_edit_foreign_recipe() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);
        let other = test_user(2, Role::Writer);

        let recipe = service
            .create(&author, create_input("Omelette", category_id))
            .await
            .expect("Failed to create recipe");

        let result = service
            .update(
                &other,
                recipe.id,
                UpdateRecipeInput {
                    content: Some("Replaced by someone else entirely.".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(RecipeServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_editor_edits_any_recipe() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);
        let editor = test_user(2, Role::Editor);

        let recipe = service
            .create(&author, create_input("Omelette", category_id))
            .await
            .expect("Failed to create recipe");

        let updated = service
            .update(
                &editor,
                recipe.id,
                UpdateRecipeInput {
                    theme: Some(Some("Weekend brunch classic".to_string())),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update recipe");

        assert_eq!(updated.theme.as_deref(), Some("Weekend brunch classic"));
    }

    #[tokio::test]
    async fn test_update_title_regenerates_slug() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let recipe = service
            .create(&author, create_input("Old Name", category_id))
            .await
            .expect("Failed to create recipe");

        let updated = service
            .update(
                &author,
                recipe.id,
                UpdateRecipeInput {
                    title: Some("Brand New Name".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update recipe");

        assert_eq!(updated.slug, "brand-new-name");
    }

    #[tokio::test]
    async fn test_update_same_title_keeps_slug() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let recipe = service
            .create(&author, create_input("Stable Name", category_id))
            .await
            .expect("Failed to create recipe");

        let updated = service
            .update(
                &author,
                recipe.id,
                UpdateRecipeInput {
                    title: Some("Stable Name".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update recipe");

        assert_eq!(updated.slug, "stable-name");
    }

    #[tokio::test]
    async fn test_update_without_changes_is_noop() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let recipe = service
            .create(&author, create_input("Unchanged", category_id))
            .await
            .expect("Failed to create recipe");

        let result = service
            .update(&author, recipe.id, UpdateRecipeInput::default())
            .await
            .expect("Noop update should succeed");

        assert_eq!(result.title, "Unchanged");
    }

    #[tokio::test]
    async fn test_author_deletes_own_recipe() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let recipe = service
            .create(&author, create_input("Short Lived", category_id))
            .await
            .expect("Failed to create recipe");

        service
            .delete(&author, recipe.id)
            .await
            .expect("Failed to delete recipe");

        assert!(service.get_by_id(recipe.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_editor_cannot_delete_foreign_recipe() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);
        let editor = test_user(2, Role::Editor);

        let recipe = service
            .create(&author, create_input("Protected", category_id))
            .await
            .expect("Failed to create recipe");

        let result = service.delete(&editor, recipe.id).await;
        assert!(matches!(result, Err(RecipeServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_deletes_any_recipe() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);
        let admin = test_user(2, Role::Admin);

        let recipe = service
            .create(&author, create_input("Doomed", category_id))
            .await
            .expect("Failed to create recipe");

        service
            .delete(&admin, recipe.id)
            .await
            .expect("Failed to delete recipe");
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let (_pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        service
            .create(&author, create_input("First Recipe", category_id))
            .await
            .expect("Failed to create recipe");
        service
            .create(&author, create_input("Second Recipe", category_id))
            .await
            .expect("Failed to create recipe");

        let page = service
            .list(Some(category_id), &ListParams::default())
            .await
            .expect("Failed to list");

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "Second Recipe");

        let other = service
            .list(Some(999), &ListParams::default())
            .await
            .expect("Failed to list");
        assert_eq!(other.total, 0);
    }

    #[tokio::test]
    async fn test_get_by_slug_with_images() {
        let (pool, service, category_id) = setup_test_service().await;
        let author = test_user(1, Role::Writer);

        let image_repo = SqlxImageRepository::new(pool.clone());
        let image = image_repo
            .create(&Image::new(
                "photo.png".to_string(),
                "/uploads/photo.png".to_string(),
                1024,
                "image/png".to_string(),
            ))
            .await
            .expect("Failed to create image");

        let mut input = create_input("Photographed Dish", category_id);
        input.image_ids = vec![image.id];

        service
            .create(&author, input)
            .await
            .expect("Failed to create recipe");

        let (recipe, images) = service
            .get_by_slug("photographed-dish")
            .await
            .expect("Failed to get recipe")
            .expect("Recipe not found");

        assert_eq!(recipe.title, "Photographed Dish");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "photo.png");
    }
}
