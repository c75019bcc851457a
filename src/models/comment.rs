//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum comment length in characters
pub const MAX_COMMENT_LENGTH: usize = 3000;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub recipe_id: i64,
    pub user_id: i64,
    pub content: String,
    /// Star rating 1-5; comments without a rating carry none
    pub rating: Option<i32>,
    pub published_at: DateTime<Utc>,
}

/// Comment with author info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub recipe_id: i64,
    pub user_id: i64,
    pub username: String,
    pub usergroup: String,
    pub content: String,
    pub rating: Option<i32>,
    pub published_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub content: String,
    pub rating: Option<i32>,
}

/// Input for updating a comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommentInput {
    pub content: Option<String>,
    /// `Some(None)` removes the rating
    pub rating: Option<Option<i32>>,
}
