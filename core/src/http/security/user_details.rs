//! User Details Service for loading users from a credential store.
//!
//! # Spring Security Equivalent
//! `UserDetailsService`, `UserDetailsManager` and `DaoAuthenticationProvider`
//!
//! # Example
//! ```rust,ignore
//! use warden_core::http::security::user_details::{UserDetailsService, UserDetailsError};
//! use async_trait::async_trait;
//!
//! struct ApiUserDetailsService { client: ApiClient }
//!
//! #[async_trait]
//! impl UserDetailsService for ApiUserDetailsService {
//!     async fn load_user_by_username(&self, username: &str) -> Result<Option<User>, UserDetailsError> {
//!         self.client.fetch(username).await.map_err(UserDetailsError::storage)
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use derive_more::{Display, Error};
use tokio::sync::RwLock;

use crate::http::error::AuthError;
use crate::http::security::crypto::{EncodingError, PasswordEncoder};
use crate::http::security::User;

// =============================================================================
// User Details Error
// =============================================================================

/// Errors that can occur when loading or managing user details.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum UserDetailsError {
    #[display("user not found")]
    NotFound,
    #[display("user already exists")]
    AlreadyExists,
    #[display("username must not be empty")]
    InvalidUsername,
    /// The backing store failed or could not be reached.
    #[display("storage error: {reason}")]
    StorageError { reason: String },
}

impl UserDetailsError {
    pub fn storage(reason: impl ToString) -> Self {
        UserDetailsError::StorageError {
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// User Details Service Trait
// =============================================================================

/// Async trait for loading user details from any data source.
///
/// # Spring Security Equivalent
/// `UserDetailsService`
#[async_trait]
pub trait UserDetailsService: Send + Sync {
    /// Returns `Ok(Some(user))` if found, `Ok(None)` if not found,
    /// or `Err(...)` if the store failed.
    async fn load_user_by_username(&self, username: &str)
        -> Result<Option<User>, UserDetailsError>;

    async fn user_exists(&self, username: &str) -> Result<bool, UserDetailsError> {
        Ok(self.load_user_by_username(username).await?.is_some())
    }
}

// =============================================================================
// User Details Manager Trait
// =============================================================================

/// User provisioning on top of [`UserDetailsService`].
///
/// # Spring Security Equivalent
/// `UserDetailsManager`
///
/// Accounts are never removed. [`disable_user`](Self::disable_user) keeps the
/// row and its grants but stops the account from logging in.
#[async_trait]
pub trait UserDetailsManager: UserDetailsService {
    /// Stores a new user. The password must already be encoded.
    async fn create_user(&self, user: &User) -> Result<(), UserDetailsError>;

    /// Replaces password, enabled flag and grants of an existing user.
    async fn update_user(&self, user: &User) -> Result<(), UserDetailsError>;

    async fn disable_user(&self, username: &str) -> Result<(), UserDetailsError>;

    /// Stores a new encoded password.
    async fn change_password(
        &self,
        username: &str,
        new_encoded_password: &str,
    ) -> Result<(), UserDetailsError>;
}

// =============================================================================
// In-Memory User Details Service
// =============================================================================

/// In-memory implementation of [`UserDetailsManager`].
///
/// Useful for testing or small applications.
#[derive(Clone, Default)]
pub struct InMemoryUserDetailsService {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserDetailsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.get_username().to_string(), user);
    }
}

#[async_trait]
impl UserDetailsService for InMemoryUserDetailsService {
    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserDetailsError> {
        let users = self.users.read().await;
        Ok(users.get(username).cloned())
    }
}

#[async_trait]
impl UserDetailsManager for InMemoryUserDetailsService {
    async fn create_user(&self, user: &User) -> Result<(), UserDetailsError> {
        if user.get_username().is_empty() {
            return Err(UserDetailsError::InvalidUsername);
        }
        let mut users = self.users.write().await;
        let username = user.get_username().to_string();
        if users.contains_key(&username) {
            return Err(UserDetailsError::AlreadyExists);
        }
        users.insert(username, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), UserDetailsError> {
        let mut users = self.users.write().await;
        match users.get_mut(user.get_username()) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(UserDetailsError::NotFound),
        }
    }

    async fn disable_user(&self, username: &str) -> Result<(), UserDetailsError> {
        let mut users = self.users.write().await;
        match users.get_mut(username) {
            Some(user) => {
                *user = user.clone().enabled(false);
                Ok(())
            }
            None => Err(UserDetailsError::NotFound),
        }
    }

    async fn change_password(
        &self,
        username: &str,
        new_encoded_password: &str,
    ) -> Result<(), UserDetailsError> {
        let mut users = self.users.write().await;
        match users.get_mut(username) {
            Some(user) => {
                *user = user.with_password(new_encoded_password.to_string());
                Ok(())
            }
            None => Err(UserDetailsError::NotFound),
        }
    }
}

// =============================================================================
// User Details Authenticator
// =============================================================================

/// Verifies submitted credentials against a [`UserDetailsService`].
///
/// # Spring Equivalent
/// `DaoAuthenticationProvider`
///
/// Unknown users still cost one hash verification against a dummy hash, so
/// timing does not reveal which usernames exist.
#[derive(Clone)]
pub struct UserDetailsAuthenticator {
    service: Arc<dyn UserDetailsService>,
    encoder: Arc<dyn PasswordEncoder>,
    dummy_hash: String,
}

impl UserDetailsAuthenticator {
    pub fn new(
        service: Arc<dyn UserDetailsService>,
        encoder: Arc<dyn PasswordEncoder>,
    ) -> Result<Self, EncodingError> {
        let dummy_hash = encoder.encode("userNotFoundPassword")?;
        Ok(Self {
            service,
            encoder,
            dummy_hash,
        })
    }

    /// Returns the user, without its password hash, when the credentials are good
    /// and the account is enabled.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let loaded = self
            .service
            .load_user_by_username(username)
            .await
            .map_err(|e| {
                log::error!("Credential store unavailable while loading '{}': {}", username, e);
                AuthError::DataStoreUnavailable
            })?;

        let Some(user) = loaded else {
            self.encoder.matches(password, &self.dummy_hash);
            log::debug!("Authentication failed for '{}': unknown user", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.encoder.matches(password, user.get_password()) {
            log::debug!("Authentication failed for '{}': bad password", username);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_enabled() {
            log::debug!("Authentication failed for '{}': account disabled", username);
            return Err(AuthError::AccountDisabled);
        }

        if self.encoder.upgrade_encoding(user.get_password()) {
            log::info!("Password hash of '{}' uses outdated parameters", username);
        }

        Ok(user.erase_credentials())
    }

    pub fn encoder(&self) -> &dyn PasswordEncoder {
        self.encoder.as_ref()
    }
}
