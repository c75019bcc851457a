//! Comment service
//!
//! Comments carry free text and an optional 1 to 5 rating. Authors may
//! edit their own comments; deletion is open to the author or an admin.

use crate::db::repositories::{CommentRepository, RecipeRepository};
use crate::models::{
    Comment, CommentWithAuthor, CreateCommentInput, ListParams, PagedResult, UpdateCommentInput,
    User, MAX_COMMENT_LENGTH,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for comment operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Caller is not allowed to perform this operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Comment or recipe not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            comment_repo,
            recipe_repo,
        }
    }

    /// List comments on a recipe, newest first
    pub async fn list_by_recipe(
        &self,
        recipe_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithAuthor>, CommentServiceError> {
        if self
            .recipe_repo
            .get_by_id(recipe_id)
            .await
            .context("Failed to check recipe")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound("Recipe not found".to_string()));
        }

        let (comments, total) = self
            .comment_repo
            .list_by_recipe(recipe_id, params.limit(), params.offset())
            .await
            .context("Failed to list comments")?;

        Ok(PagedResult::new(comments, total, params))
    }

    /// Post a comment on a recipe
    pub async fn create(
        &self,
        author: &User,
        recipe_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        if self
            .recipe_repo
            .get_by_id(recipe_id)
            .await
            .context("Failed to check recipe")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound("Recipe not found".to_string()));
        }

        validate_content(&input.content)?;
        validate_rating(input.rating)?;

        let comment = Comment {
            id: 0,
            recipe_id,
            user_id: author.id,
            content: input.content,
            rating: input.rating,
            published_at: Utc::now(),
        };

        let created = self
            .comment_repo
            .create(&comment)
            .await
            .context("Failed to create comment")?;

        Ok(created)
    }

    /// Edit a comment
    ///
    /// Author only; even admins do not rewrite other people's words.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let mut comment = self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound("Comment not found".to_string()))?;

        if comment.user_id != actor.id {
            return Err(CommentServiceError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        if let Some(content) = input.content {
            validate_content(&content)?;
            comment.content = content;
        }

        if let Some(rating) = input.rating {
            validate_rating(rating)?;
            comment.rating = rating;
        }

        let updated = self
            .comment_repo
            .update(&comment)
            .await
            .context("Failed to update comment")?;

        Ok(updated)
    }

    /// Delete a comment
    ///
    /// The author or an admin.
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), CommentServiceError> {
        let comment = self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound("Comment not found".to_string()))?;

        if comment.user_id != actor.id && !actor.is_admin() {
            return Err(CommentServiceError::Forbidden(
                "You are not allowed to delete this comment".to_string(),
            ));
        }

        self.comment_repo
            .delete(id)
            .await
            .context("Failed to delete comment")?;

        Ok(())
    }
}

fn validate_content(content: &str) -> Result<(), CommentServiceError> {
    let len = content.trim().chars().count();
    if len == 0 {
        return Err(CommentServiceError::ValidationError(
            "Comment cannot be empty".to_string(),
        ));
    }
    if len > MAX_COMMENT_LENGTH {
        return Err(CommentServiceError::ValidationError(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(())
}

fn validate_rating(rating: Option<i32>) -> Result<(), CommentServiceError> {
    if let Some(rating) = rating {
        if !(1..=5).contains(&rating) {
            return Err(CommentServiceError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
    }
    Ok(())
}
