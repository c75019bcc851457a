//! User model
//!
//! This module defines the User entity, the ordered `Role` enum used for
//! authorization, and the input types for registration and profile updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
///
/// Accounts start disabled with a confirmation token; confirming the token
/// enables login. Roles form an ordered ladder from Subscriber to Superadmin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name shown on recipes and comments
    pub usergroup: String,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: Role,
    /// Whether the account has been confirmed and may log in
    pub enabled: bool,
    /// Email confirmation token; present only while the account is unconfirmed
    #[serde(skip_serializing)]
    pub confirmation_token: Option<String>,
    /// Password reset token; present only while a reset is pending
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    /// Timestamp of the last password change
    pub password_changed_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new unconfirmed User with the given parameters.
    ///
    /// Note: The password should already be hashed before calling this function.
    /// Use `services::password::hash_password()` to hash the password.
    pub fn new(
        usergroup: String,
        username: String,
        email: String,
        password_hash: String,
        confirmation_token: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            usergroup,
            username,
            email,
            password_hash,
            role: Role::Subscriber,
            enabled: false,
            confirmation_token: Some(confirmation_token),
            reset_token: None,
            password_changed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator (or higher)
    pub fn is_admin(&self) -> bool {
        self.role.at_least(Role::Admin)
    }

    /// Check if the user is a superadmin
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    /// Check if the user may edit the recipe authored by `author_id`.
    ///
    /// Editors and above edit any recipe; writers only their own.
    pub fn can_edit_recipe(&self, author_id: Option<i64>) -> bool {
        self.role.at_least(Role::Editor) || author_id == Some(self.id)
    }

    /// Check if the user may delete the recipe authored by `author_id`.
    ///
    /// Admins delete any recipe; otherwise only the author may.
    pub fn can_delete_recipe(&self, author_id: Option<i64>) -> bool {
        self.is_admin() || author_id == Some(self.id)
    }
}

/// User role for authorization.
///
/// Roles are strictly ordered; each tier includes the permissions of the
/// tiers below it:
/// - Subscriber: browse and comment
/// - Writer: post recipes and upload images
/// - Editor: edit any recipe
/// - Admin: manage users, categories and all content
/// - Superadmin: assign roles, delete other admins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Subscriber - browse and comment
    Subscriber,
    /// Writer - post recipes
    Writer,
    /// Editor - edit any recipe
    Editor,
    /// Admin - manage users and categories
    Admin,
    /// Superadmin - assign roles
    Superadmin,
}

impl Role {
    /// Numeric rank used for ordering comparisons
    fn rank(self) -> u8 {
        match self {
            Role::Subscriber => 0,
            Role::Writer => 1,
            Role::Editor => 2,
            Role::Admin => 3,
            Role::Superadmin => 4,
        }
    }

    /// Check if this role is at least as privileged as `other`
    pub fn at_least(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    /// Convert role to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Subscriber => "subscriber",
            Role::Writer => "writer",
            Role::Editor => "editor",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Subscriber
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "subscriber" => Ok(Role::Subscriber),
            "writer" => Ok(Role::Writer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Display name
    pub usergroup: String,
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Password typed a second time; must match `password`
    pub retyped_password: String,
}

/// Input for updating a user's profile
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserInput {
    /// New display name
    pub usergroup: String,
    /// New email
    pub email: String,
}
