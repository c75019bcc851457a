//! Account service
//!
//! Implements the account lifecycle:
//! - Registration with email confirmation (accounts start disabled)
//! - Login/logout with per-username and per-IP rate limiting
//! - Session management with a seven day expiry
//! - Password reset and password change, both of which revoke every
//!   existing session and hand back a single fresh one

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::mailer::Mailer;
use crate::services::password::{hash_password, validate_password_strength, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Account exists but has not been confirmed or was disabled
    #[error("Account is disabled")]
    AccountDisabled,

    /// Too many attempts from this username or IP
    #[error("Too many attempts: {0}")]
    RateLimited(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Token or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Account service for registration, authentication, and sessions
pub struct AccountService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    mailer: Arc<Mailer>,
    rate_limiter: Arc<LoginRateLimiter>,
    session_expiration_days: i64,
}

impl AccountService {
    /// Create a new account service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        mailer: Arc<Mailer>,
        rate_limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            mailer,
            rate_limiter,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create a new account service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        mailer: Arc<Mailer>,
        rate_limiter: Arc<LoginRateLimiter>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            mailer,
            rate_limiter,
            session_expiration_days,
        }
    }

    /// Register a new user
    ///
    /// The account is created disabled with a confirmation token; the
    /// confirmation email carries the token and [`confirm`](Self::confirm)
    /// enables the account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if any field fails validation
    /// - `UserExists` if username or email is already taken
    /// - `InternalError` for database errors
    pub async fn register(&self, input: CreateUserInput) -> Result<User, AccountServiceError> {
        self.validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(AccountServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(AccountServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let confirmation_token = generate_token();

        let user = User::new(
            input.usergroup,
            input.username,
            input.email,
            password_hash,
            confirmation_token.clone(),
        );

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        // Delivery problems must not lose the registration
        if let Err(e) = self
            .mailer
            .send_confirmation(&created.email, &created.username, &confirmation_token)
            .await
        {
            tracing::warn!(user_id = created.id, error = %e, "Failed to send confirmation email");
        }

        Ok(created)
    }

    /// Confirm an account with its confirmation token
    ///
    /// Enables the account and clears the token, so a token can only be
    /// used once.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the token is unknown or was already used
    pub async fn confirm(&self, token: &str) -> Result<User, AccountServiceError> {
        let mut user = self
            .user_repo
            .get_by_confirmation_token(token)
            .await
            .context("Failed to look up confirmation token")?
            .ok_or_else(|| {
                AccountServiceError::NotFound("Unknown or already used confirmation token".to_string())
            })?;

        user.enabled = true;
        user.confirmation_token = None;

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to enable account")?;

        Ok(updated)
    }

    /// Login with credentials
    ///
    /// Accepts a username or an email address. Disabled accounts cannot
    /// log in even with correct credentials.
    ///
    /// # Errors
    ///
    /// - `RateLimited` if the username or IP has too many recent failures
    /// - `AuthenticationError` if credentials are invalid
    /// - `AccountDisabled` if the account is not confirmed or was disabled
    pub async fn login(
        &self,
        input: LoginInput,
        ip: Option<IpAddr>,
    ) -> Result<(Session, User), AccountServiceError> {
        if let Some(ip) = ip {
            if self.rate_limiter.is_ip_limited(ip).await {
                return Err(AccountServiceError::RateLimited(
                    "Too many login attempts from this address, try again later".to_string(),
                ));
            }
            self.rate_limiter.record_ip_request(ip).await;
        }

        if self
            .rate_limiter
            .is_username_limited(&input.username_or_email)
            .await
        {
            return Err(AccountServiceError::RateLimited(
                "Too many failed attempts for this account, try again later".to_string(),
            ));
        }

        let user = match self
            .find_user_by_username_or_email(&input.username_or_email)
            .await?
        {
            Some(user) => user,
            None => {
                self.rate_limiter
                    .record_failed_attempt(&input.username_or_email)
                    .await;
                return Err(AccountServiceError::AuthenticationError(
                    "Invalid username or password".to_string(),
                ));
            }
        };

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !password_valid {
            self.rate_limiter
                .record_failed_attempt(&input.username_or_email)
                .await;
            return Err(AccountServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        if !user.enabled {
            return Err(AccountServiceError::AccountDisabled);
        }

        self.rate_limiter
            .clear_username_attempts(&input.username_or_email)
            .await;

        let session = self.create_session(user.id).await?;

        Ok((session, user))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), AccountServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Validate a session token and return the associated user
    ///
    /// Expired sessions are deleted on sight and validate to `None`.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, AccountServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        // A session for an account that has since been disabled is dead
        Ok(user.filter(|u| u.enabled))
    }

    /// Start a password reset
    ///
    /// Always succeeds from the caller's point of view, so the endpoint
    /// cannot be used to probe which emails are registered. When the
    /// email matches an account, a reset token is stored and mailed.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AccountServiceError> {
        let user = match self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to look up email")?
        {
            Some(user) => user,
            None => {
                tracing::debug!(email = %email, "Password reset requested for unknown email");
                return Ok(());
            }
        };

        let token = generate_token();
        let mut user = user;
        user.reset_token = Some(token.clone());

        self.user_repo
            .update(&user)
            .await
            .context("Failed to store reset token")?;

        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &user.username, &token)
            .await
        {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send reset email");
        }

        Ok(())
    }

    /// Complete a password reset with the emailed token
    ///
    /// The token is single use. Every existing session is revoked and a
    /// single fresh session is returned, so the caller stays logged in
    /// while anything that held the old credentials does not.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the token is unknown or was already used
    /// - `AccountDisabled` if the account is unconfirmed or disabled
    /// - `ValidationError` if the new password fails the strength rules
    ///   or the confirmation does not match
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        retyped_password: &str,
    ) -> Result<(Session, User), AccountServiceError> {
        let mut user = self
            .user_repo
            .get_by_reset_token(token)
            .await
            .context("Failed to look up reset token")?
            .ok_or_else(|| {
                AccountServiceError::NotFound("Unknown or already used reset token".to_string())
            })?;

        // Same gate as login: a reset must not hand a session to an
        // account that could not log in
        if !user.enabled {
            return Err(AccountServiceError::AccountDisabled);
        }

        self.validate_new_password(new_password, retyped_password)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        user.reset_token = None;
        user.password_changed_at = Utc::now();

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        let session = self.reissue_sessions(updated.id).await?;

        Ok((session, updated))
    }

    /// Change the password of a logged-in user
    ///
    /// Requires the current password. Revokes every existing session and
    /// returns a single fresh one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `AuthenticationError` if the current password is wrong
    /// - `ValidationError` if the new password fails the strength rules
    ///   or the confirmation does not match
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        retyped_password: &str,
    ) -> Result<Session, AccountServiceError> {
        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| AccountServiceError::NotFound("User not found".to_string()))?;

        let current_valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;

        if !current_valid {
            return Err(AccountServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }

        self.validate_new_password(new_password, retyped_password)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        user.password_changed_at = Utc::now();

        self.user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        self.reissue_sessions(user_id).await
    }

    /// Delete all expired sessions
    ///
    /// Maintenance operation, called periodically.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, AccountServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    fn validate_register_input(&self, input: &CreateUserInput) -> Result<(), AccountServiceError> {
        let usergroup_len = input.usergroup.trim().chars().count();
        if !(3..=40).contains(&usergroup_len) {
            return Err(AccountServiceError::ValidationError(
                "Usergroup must be between 3 and 40 characters".to_string(),
            ));
        }

        let username_len = input.username.trim().chars().count();
        if !(3..=60).contains(&username_len) {
            return Err(AccountServiceError::ValidationError(
                "Username must be between 3 and 60 characters".to_string(),
            ));
        }

        let email_len = input.email.trim().chars().count();
        if !(6..=255).contains(&email_len) || !input.email.contains('@') {
            return Err(AccountServiceError::ValidationError(
                "Invalid email address".to_string(),
            ));
        }

        validate_password_strength(&input.password).map_err(AccountServiceError::ValidationError)?;

        if input.password != input.retyped_password {
            return Err(AccountServiceError::ValidationError(
                "Passwords do not match".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_new_password(
        &self,
        new_password: &str,
        retyped_password: &str,
    ) -> Result<(), AccountServiceError> {
        validate_password_strength(new_password).map_err(AccountServiceError::ValidationError)?;

        if new_password != retyped_password {
            return Err(AccountServiceError::ValidationError(
                "Passwords do not match".to_string(),
            ));
        }

        Ok(())
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, AccountServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?;

        Ok(user)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, AccountServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Revoke every session of a user and create a single fresh one
    async fn reissue_sessions(&self, user_id: i64) -> Result<Session, AccountServiceError> {
        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to revoke sessions")?;

        self.create_session(user_id).await
    }
}

/// Generate an opaque token for confirmation and reset links
fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    /// Create a new login input
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
