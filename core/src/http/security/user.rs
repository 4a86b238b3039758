//! User model for authentication and authorization.
//!
//! # Spring Equivalent
//! `UserDetails` interface

use std::fmt;

/// Prefix under which roles are stored as authorities in the credential store.
pub const ROLE_PREFIX: &str = "ROLE_";

/// An account known to the credential store, or the principal of a request.
///
/// # Spring Equivalent
/// `UserDetails` / `User`
///
/// # Example
/// ```
/// use warden_core::http::security::User;
///
/// let user = User::with_encoded_password("daffy", "{noop}duck".into())
///     .roles(&["USER".into(), "MANAGER".into()]);
///
/// assert!(user.has_role("MANAGER"));
/// assert!(user.is_enabled());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    username: String,
    password: String,
    enabled: bool,
    roles: Vec<String>,
    authorities: Vec<String>,
}

impl User {
    /// Creates an enabled user with a pre-encoded password and no grants.
    pub fn with_encoded_password(username: &str, encoded_password: String) -> Self {
        User {
            username: username.to_string(),
            password: encoded_password,
            enabled: true,
            roles: Vec::new(),
            authorities: Vec::new(),
        }
    }

    /// Creates a principal without credentials, as rebuilt from a session.
    pub fn principal(username: &str) -> Self {
        Self::with_encoded_password(username, String::new())
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    /// Returns the encoded password.
    pub fn get_password(&self) -> &str {
        &self.password
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_roles(&self) -> &[String] {
        &self.roles
    }

    pub fn get_authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Adds roles (builder pattern). Duplicates are ignored.
    pub fn roles(mut self, roles: &[String]) -> Self {
        for role in roles {
            let role = role.strip_prefix(ROLE_PREFIX).unwrap_or(role);
            if !self.roles.iter().any(|r| r == role) {
                self.roles.push(role.to_string());
            }
        }
        self
    }

    /// Adds authorities (builder pattern). Duplicates are ignored.
    pub fn authorities(mut self, authorities: &[String]) -> Self {
        for authority in authorities {
            if !self.authorities.contains(authority) {
                self.authorities.push(authority.clone());
            }
        }
        self
    }

    /// Sets the enabled flag (builder pattern).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns a copy carrying a new encoded password.
    pub fn with_password(&self, encoded_password: String) -> Self {
        User {
            password: encoded_password,
            ..self.clone()
        }
    }

    /// Returns a copy without the password hash.
    pub fn erase_credentials(&self) -> Self {
        self.with_password(String::new())
    }

    /// Splits stored authority rows into roles (`ROLE_` prefixed) and plain authorities.
    pub fn granted(mut self, rows: &[String]) -> Self {
        for row in rows {
            match row.strip_prefix(ROLE_PREFIX) {
                Some(role) => self = self.roles(&[role.to_string()]),
                None => self = self.authorities(&[row.clone()]),
            }
        }
        self
    }

    /// All grants in their stored form: roles prefixed with `ROLE_`, then authorities.
    pub fn granted_authorities(&self) -> Vec<String> {
        self.roles
            .iter()
            .map(|r| format!("{}{}", ROLE_PREFIX, r))
            .chain(self.authorities.iter().cloned())
            .collect()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Checks if the user has ANY of the specified roles (OR logic).
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    /// Checks if the user has ANY of the specified authorities (OR logic).
    pub fn has_any_authority<S: AsRef<str>>(&self, authorities: &[S]) -> bool {
        authorities.iter().any(|a| self.has_authority(a.as_ref()))
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {{ username: {}, enabled: {}, roles: {:?}, authorities: {:?} }}",
            self.username, self.enabled, self.roles, self.authorities
        )
    }
}
