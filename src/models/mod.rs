//! Data models
//!
//! This module contains all data structures used throughout Cocotte.
//! Models represent:
//! - Database entities (User, Category, Recipe, Image, Comment, Session)
//! - Input types consumed by the service layer
//! - Pagination containers shared by list queries

mod category;
mod comment;
mod image;
mod recipe;
mod session;
mod user;

pub use category::{Category, CategoryWithCount, CreateCategoryInput};
pub use comment::{
    Comment, CommentWithAuthor, CreateCommentInput, UpdateCommentInput, MAX_COMMENT_LENGTH,
};
pub use image::Image;
pub use recipe::{CreateRecipeInput, ListParams, PagedResult, Recipe, UpdateRecipeInput};
pub use session::Session;
pub use user::{CreateUserInput, Role, UpdateUserInput, User};
