//! User management service
//!
//! Profile updates, role assignment, listing, and deletion. Object-level
//! rules live here: self-or-admin for profile edits, superadmin for role
//! changes, and superadmin accounts only deletable by another superadmin.

use crate::db::repositories::UserRepository;
use crate::models::{ListParams, PagedResult, Role, UpdateUserInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for user management operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Caller is not allowed to perform this operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for profile and role management
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Update a user's profile (usergroup and email)
    ///
    /// Users may edit their own profile; admins may edit anyone's.
    pub async fn update_profile(
        &self,
        actor: &User,
        target_id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        if actor.id != target_id && !actor.is_admin() {
            return Err(UserServiceError::Forbidden(
                "You can only edit your own profile".to_string(),
            ));
        }

        let mut user = self
            .user_repo
            .get_by_id(target_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        let usergroup_len = input.usergroup.trim().chars().count();
        if !(3..=40).contains(&usergroup_len) {
            return Err(UserServiceError::ValidationError(
                "Usergroup must be between 3 and 40 characters".to_string(),
            ));
        }

        let email_len = input.email.trim().chars().count();
        if !(6..=255).contains(&email_len) || !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email address".to_string(),
            ));
        }

        if input.email != user.email {
            if self
                .user_repo
                .get_by_email(&input.email)
                .await
                .context("Failed to check email")?
                .is_some()
            {
                return Err(UserServiceError::UserExists(format!(
                    "Email '{}' is already registered",
                    input.email
                )));
            }
        }

        user.usergroup = input.usergroup;
        user.email = input.email;

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update profile")?;

        Ok(updated)
    }

    /// Assign a role to a user
    ///
    /// Superadmin only.
    pub async fn assign_role(
        &self,
        actor: &User,
        target_id: i64,
        role: Role,
    ) -> Result<User, UserServiceError> {
        if !actor.is_superadmin() {
            return Err(UserServiceError::Forbidden(
                "Only a superadmin can assign roles".to_string(),
            ));
        }

        let mut user = self
            .user_repo
            .get_by_id(target_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        user.role = role;

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to assign role")?;

        Ok(updated)
    }

    /// Delete a user account
    ///
    /// Admin only; superadmin accounts can only be deleted by another
    /// superadmin. Recipes keep their rows with a null author, comments
    /// go with the account.
    pub async fn delete(&self, actor: &User, target_id: i64) -> Result<(), UserServiceError> {
        if !actor.is_admin() {
            return Err(UserServiceError::Forbidden(
                "Only an admin can delete accounts".to_string(),
            ));
        }

        let target = self
            .user_repo
            .get_by_id(target_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        if target.is_superadmin() && !actor.is_superadmin() {
            return Err(UserServiceError::Forbidden(
                "Only a superadmin can delete a superadmin account".to_string(),
            ));
        }

        self.user_repo
            .delete(target_id)
            .await
            .context("Failed to delete user")?;

        Ok(())
    }

    /// Paginated user listing, for the admin panel
    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params.page as i64, params.per_page as i64)
            .await
            .context("Failed to list users")?;

        Ok(PagedResult::new(users, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::services::password::hash_password;

    async fn setup_test_service() -> (DynDatabasePool, UserService, Arc<dyn UserRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let service = UserService::new(user_repo.clone());

        (pool, service, user_repo)
    }

    async fn create_user(repo: &Arc<dyn UserRepository>, username: &str, role: Role) -> User {
        let mut user = User::new(
            "Test Kitchen".to_string(),
            username.to_string(),
            format!("{}@example.com", username),
            hash_password("Qwerty0000").unwrap(),
            uuid::Uuid::new_v4().simple().to_string(),
        );
        user.enabled = true;
        user.role = role;
        repo.create(&user).await.expect("Failed to create user")
    }

    #[tokio::test]
    async fn test_update_own_profile() {
        let (_pool, service, repo) = setup_test_service().await;
        let user = create_user(&repo, "alice", Role::Subscriber).await;

        let updated = service
            .update_profile(
                &user,
                user.id,
                UpdateUserInput {
                    usergroup: "Pastry Corner".to_string(),
                    email: "alice.new@example.com".to_string(),
                },
            )
            .await
            .expect("Failed to update profile");

        assert_eq!(updated.usergroup, "Pastry Corner");
        assert_eq!(updated.email, "alice.new@example.com");
    }

    #[tokio::test]
    async fn test_update_other_profile_forbidden_for_non_admin() {
        let (_pool, service, repo) = setup_test_service().await;
        let alice = create_user(&repo, "alice", Role::Subscriber).await;
        let bob = create_user(&repo, "bob", Role::Writer).await;

        let result = service
            .update_profile(
                &bob,
                alice.id,
                UpdateUserInput {
                    usergroup: "Hijacked".to_string(),
                    email: "hijack@example.com".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_can_update_any_profile() {
        let (_pool, service, repo) = setup_test_service().await;
        let alice = create_user(&repo, "alice", Role::Subscriber).await;
        let admin = create_user(&repo, "admin", Role::Admin).await;

        let updated = service
            .update_profile(
                &admin,
                alice.id,
                UpdateUserInput {
                    usergroup: "Fixed Group".to_string(),
                    email: "alice@example.com".to_string(),
                },
            )
            .await
            .expect("Failed to update profile");

        assert_eq!(updated.usergroup, "Fixed Group");
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_email() {
        let (_pool, service, repo) = setup_test_service().await;
        let alice = create_user(&repo, "alice", Role::Subscriber).await;
        let _bob = create_user(&repo, "bob", Role::Subscriber).await;

        let result = service
            .update_profile(
                &alice,
                alice.id,
                UpdateUserInput {
                    usergroup: "Test Kitchen".to_string(),
                    email: "bob@example.com".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_assign_role_requires_superadmin() {
        let (_pool, service, repo) = setup_test_service().await;
        let alice = create_user(&repo, "alice", Role::Subscriber).await;
        let admin = create_user(&repo, "admin", Role::Admin).await;

        let result = service.assign_role(&admin, alice.id, Role::Editor).await;
        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_superadmin_assigns_role() {
        let (_pool, service, repo) = setup_test_service().await;
        let alice = create_user(&repo, "alice", Role::Subscriber).await;
        let boss = create_user(&repo, "boss", Role::Superadmin).await;

        let updated = service
            .assign_role(&boss, alice.id, Role::Writer)
            .await
            .expect("Failed to assign role");

        assert_eq!(updated.role, Role::Writer);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let (_pool, service, repo) = setup_test_service().await;
        let alice = create_user(&repo, "alice", Role::Subscriber).await;
        let writer = create_user(&repo, "writer", Role::Writer).await;

        let result = service.delete(&writer, alice.id).await;
        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_superadmin() {
        let (_pool, service, repo) = setup_test_service().await;
        let boss = create_user(&repo, "boss", Role::Superadmin).await;
        let admin = create_user(&repo, "admin", Role::Admin).await;

        let result = service.delete(&admin, boss.id).await;
        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_superadmin_can_delete_superadmin() {
        let (_pool, service, repo) = setup_test_service().await;
        let boss = create_user(&repo, "boss", Role::Superadmin).await;
        let other = create_user(&repo, "other", Role::Superadmin).await;

        service
            .delete(&boss, other.id)
            .await
            .expect("Failed to delete");

        assert!(service.get_by_id(other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let (_pool, service, repo) = setup_test_service().await;
        let admin = create_user(&repo, "admin", Role::Admin).await;

        let result = service.delete(&admin, 999).await;
        assert!(matches!(result, Err(UserServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_users_paginated() {
        let (_pool, service, repo) = setup_test_service().await;
        for i in 0..5 {
            create_user(&repo, &format!("user{}", i), Role::Subscriber).await;
        }

        let page = service
            .list(&ListParams::new(1, 2))
            .await
            .expect("Failed to list");
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 2);
        assert_eq!(page.total_pages(), 3);
    }
}
