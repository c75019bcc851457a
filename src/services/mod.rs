//! Services layer - Business logic
//!
//! This module contains all business logic services for the Cocotte
//! recipe platform. Services are responsible for:
//! - Implementing business rules and object-level access checks
//! - Coordinating between repositories and the mailer
//! - Handling validation and error cases

pub mod account;
pub mod category;
pub mod comment;
pub mod mailer;
pub mod password;
pub mod rate_limiter;
pub mod recipe;
pub mod user;

pub use account::{AccountService, AccountServiceError, LoginInput};
pub use category::{generate_slug, CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use mailer::Mailer;
pub use password::{hash_password, validate_password_strength, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use recipe::{RecipeService, RecipeServiceError};
pub use user::{UserService, UserServiceError};
