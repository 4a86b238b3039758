//! Password encoding.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.crypto.password.PasswordEncoder`
//!
//! Every encoder here except [`NoOpPasswordEncoder`] is one-way and salted:
//! two calls to `encode` with the same input return different hashes, and
//! both verify.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use derive_more::{Display, Error};

/// Default BCrypt cost, same strength as Spring's `BCryptPasswordEncoder()`.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Error raised when a password cannot be hashed.
#[derive(Debug, Display, Error)]
#[display("password encoding failed: {reason}")]
pub struct EncodingError {
    reason: String,
}

impl EncodingError {
    fn new(reason: impl ToString) -> Self {
        EncodingError {
            reason: reason.to_string(),
        }
    }
}

/// Trait for encoding and verifying passwords.
///
/// # Spring Security Equivalent
/// `PasswordEncoder` interface
pub trait PasswordEncoder: Send + Sync {
    /// Encode the raw password with a fresh salt.
    fn encode(&self, raw_password: &str) -> Result<String, EncodingError>;

    /// Verify a raw password against an encoded password.
    ///
    /// Malformed encoded values never match.
    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;

    /// Returns true if the encoded password should be re-encoded with the current settings.
    fn upgrade_encoding(&self, _encoded_password: &str) -> bool {
        false
    }
}

/// BCrypt password encoder, the encoder the demo application wires.
///
/// # Spring Security Equivalent
/// `BCryptPasswordEncoder`
///
/// # Example
/// ```
/// use warden_core::http::security::crypto::{BCryptPasswordEncoder, PasswordEncoder};
///
/// let encoder = BCryptPasswordEncoder::with_cost(4);
/// let hash = encoder.encode("bunny").unwrap();
/// assert!(encoder.matches("bunny", &hash));
/// assert!(!encoder.matches("carrot", &hash));
/// ```
#[derive(Clone, Debug)]
pub struct BCryptPasswordEncoder {
    cost: u32,
}

impl BCryptPasswordEncoder {
    /// Creates an encoder with the default cost (10).
    pub fn new() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Creates an encoder with a custom cost, clamped to BCrypt's 4..=31 range.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BCryptPasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEncoder for BCryptPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, EncodingError> {
        bcrypt::hash(raw_password, self.cost).map_err(EncodingError::new)
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        bcrypt::verify(raw_password, encoded_password).unwrap_or(false)
    }

    fn upgrade_encoding(&self, encoded_password: &str) -> bool {
        // $2b$10$... : the cost sits between the second and third '$'
        match encoded_password
            .strip_prefix("$2")
            .and_then(|rest| rest.get(2..4))
            .and_then(|cost| cost.parse::<u32>().ok())
        {
            Some(hash_cost) => hash_cost < self.cost,
            None => true,
        }
    }
}

/// Argon2id password encoder.
///
/// # Spring Security Equivalent
/// `Argon2PasswordEncoder`
#[derive(Clone)]
pub struct Argon2PasswordEncoder {
    argon2: Argon2<'static>,
}

impl Argon2PasswordEncoder {
    /// Creates an encoder with the `argon2` crate's default parameters.
    pub fn new() -> Self {
        Argon2PasswordEncoder {
            argon2: Argon2::default(),
        }
    }

    /// Creates an encoder with explicit memory (KiB), iteration and parallelism costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, EncodingError> {
        let params = Params::new(m_cost, t_cost, p_cost, None).map_err(EncodingError::new)?;
        Ok(Argon2PasswordEncoder {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, EncodingError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(EncodingError::new)
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        match PasswordHash::new(encoded_password) {
            Ok(parsed_hash) => self
                .argon2
                .verify_password(raw_password.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Stores passwords in plain text. Test fixtures only.
///
/// # Spring Security Equivalent
/// `NoOpPasswordEncoder`
#[derive(Clone, Copy, Default)]
pub struct NoOpPasswordEncoder;

impl PasswordEncoder for NoOpPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, EncodingError> {
        Ok(raw_password.to_string())
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        raw_password == encoded_password
    }
}

/// Algorithm used by [`DelegatingPasswordEncoder`] for new hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultEncoder {
    #[default]
    BCrypt,
    Argon2,
}

/// Encoder that tags hashes with an `{id}` prefix and verifies any known id.
///
/// # Spring Security Equivalent
/// `DelegatingPasswordEncoder`
///
/// Supported prefixes: `{bcrypt}`, `{argon2}`, `{noop}`. A bare `$2…` value
/// is treated as BCrypt; any other untagged value never matches.
///
/// # Example
/// ```
/// use warden_core::http::security::crypto::{
///     BCryptPasswordEncoder, DelegatingPasswordEncoder, PasswordEncoder,
/// };
///
/// let encoder = DelegatingPasswordEncoder::new(BCryptPasswordEncoder::with_cost(4));
/// let hash = encoder.encode("duck").unwrap();
/// assert!(hash.starts_with("{bcrypt}"));
/// assert!(encoder.matches("duck", &hash));
/// assert!(encoder.matches("plain", "{noop}plain"));
/// ```
#[derive(Clone)]
pub struct DelegatingPasswordEncoder {
    bcrypt: BCryptPasswordEncoder,
    argon2: Argon2PasswordEncoder,
    default_encoder: DefaultEncoder,
}

impl DelegatingPasswordEncoder {
    pub fn new(bcrypt: BCryptPasswordEncoder) -> Self {
        DelegatingPasswordEncoder {
            bcrypt,
            argon2: Argon2PasswordEncoder::new(),
            default_encoder: DefaultEncoder::BCrypt,
        }
    }

    pub fn argon2(mut self, argon2: Argon2PasswordEncoder) -> Self {
        self.argon2 = argon2;
        self
    }

    pub fn default_encoder(mut self, encoder: DefaultEncoder) -> Self {
        self.default_encoder = encoder;
        self
    }
}

impl Default for DelegatingPasswordEncoder {
    fn default() -> Self {
        Self::new(BCryptPasswordEncoder::new())
    }
}

impl PasswordEncoder for DelegatingPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, EncodingError> {
        match self.default_encoder {
            DefaultEncoder::BCrypt => Ok(format!("{{bcrypt}}{}", self.bcrypt.encode(raw_password)?)),
            DefaultEncoder::Argon2 => Ok(format!("{{argon2}}{}", self.argon2.encode(raw_password)?)),
        }
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        if let Some(hash) = encoded_password.strip_prefix("{bcrypt}") {
            self.bcrypt.matches(raw_password, hash)
        } else if let Some(hash) = encoded_password.strip_prefix("{argon2}") {
            self.argon2.matches(raw_password, hash)
        } else if let Some(plain) = encoded_password.strip_prefix("{noop}") {
            raw_password == plain
        } else if encoded_password.starts_with("$2") {
            self.bcrypt.matches(raw_password, encoded_password)
        } else {
            false
        }
    }

    fn upgrade_encoding(&self, encoded_password: &str) -> bool {
        match self.default_encoder {
            DefaultEncoder::BCrypt => match encoded_password.strip_prefix("{bcrypt}") {
                Some(hash) => self.bcrypt.upgrade_encoding(hash),
                None => true,
            },
            DefaultEncoder::Argon2 => !encoded_password.starts_with("{argon2}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcrypt_encoder() {
        let encoder = BCryptPasswordEncoder::with_cost(4);
        let hash = encoder.encode("bunny").unwrap();

        assert_ne!(hash, "bunny");
        assert!(encoder.matches("bunny", &hash));
        assert!(!encoder.matches("carrot", &hash));
    }

    #[test]
    fn test_bcrypt_salted() {
        let encoder = BCryptPasswordEncoder::with_cost(4);
        let hash1 = encoder.encode("duck").unwrap();
        let hash2 = encoder.encode("duck").unwrap();

        assert_ne!(hash1, hash2);
        assert!(encoder.matches("duck", &hash1));
        assert!(encoder.matches("duck", &hash2));
    }

    #[test]
    fn test_bcrypt_cost_clamped() {
        assert_eq!(BCryptPasswordEncoder::with_cost(1).cost(), 4);
        assert_eq!(BCryptPasswordEncoder::with_cost(99).cost(), 31);
        assert_eq!(BCryptPasswordEncoder::new().cost(), DEFAULT_BCRYPT_COST);
    }

    #[test]
    fn test_bcrypt_upgrade_encoding() {
        let weak = BCryptPasswordEncoder::with_cost(4);
        let strong = BCryptPasswordEncoder::with_cost(5);
        let hash = weak.encode("bunny").unwrap();

        assert!(!weak.upgrade_encoding(&hash));
        assert!(strong.upgrade_encoding(&hash));
        assert!(strong.upgrade_encoding("not-a-hash"));
    }

    #[test]
    fn test_bcrypt_malformed_hash_never_matches() {
        let encoder = BCryptPasswordEncoder::with_cost(4);
        assert!(!encoder.matches("bunny", "bunny"));
        assert!(!encoder.matches("", ""));
    }

    #[test]
    fn test_argon2_encoder() {
        let encoder = Argon2PasswordEncoder::with_params(8, 1, 1).unwrap();
        let hash1 = encoder.encode("duck").unwrap();
        let hash2 = encoder.encode("duck").unwrap();

        assert_ne!(hash1, hash2);
        assert!(encoder.matches("duck", &hash1));
        assert!(encoder.matches("duck", &hash2));
        assert!(!encoder.matches("goose", &hash1));
        assert!(!encoder.matches("duck", "garbage"));
    }

    #[test]
    fn test_argon2_rejects_invalid_params() {
        assert!(Argon2PasswordEncoder::with_params(0, 0, 0).is_err());
    }

    #[test]
    fn test_noop_encoder() {
        let encoder = NoOpPasswordEncoder;
        assert_eq!(encoder.encode("plain").unwrap(), "plain");
        assert!(encoder.matches("plain", "plain"));
    }

    #[test]
    fn test_delegating_encoder() {
        let encoder = DelegatingPasswordEncoder::new(BCryptPasswordEncoder::with_cost(4));
        let hash = encoder.encode("duck").unwrap();

        assert!(hash.starts_with("{bcrypt}"));
        assert!(encoder.matches("duck", &hash));
        assert!(encoder.matches("plain", "{noop}plain"));
        assert!(!encoder.matches("plain", "plain"));
        assert!(encoder.upgrade_encoding("{noop}plain"));
        assert!(!encoder.upgrade_encoding(&hash));
    }

    #[test]
    fn test_delegating_encoder_argon2_default() {
        let encoder = DelegatingPasswordEncoder::new(BCryptPasswordEncoder::with_cost(4))
            .argon2(Argon2PasswordEncoder::with_params(8, 1, 1).unwrap())
            .default_encoder(DefaultEncoder::Argon2);
        let hash = encoder.encode("duck").unwrap();

        assert!(hash.starts_with("{argon2}"));
        assert!(encoder.matches("duck", &hash));
        assert!(encoder.upgrade_encoding("{bcrypt}$2b$04$abc"));
    }

    #[test]
    fn test_delegating_encoder_accepts_bare_bcrypt() {
        let bcrypt = BCryptPasswordEncoder::with_cost(4);
        let bare = bcrypt.encode("bunny").unwrap();
        let encoder = DelegatingPasswordEncoder::new(bcrypt);

        assert!(encoder.matches("bunny", &bare));
    }
}
