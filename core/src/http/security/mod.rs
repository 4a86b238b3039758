//! Security components, modeled on Spring Security.
//!
//! # Request Flow
//! ```text
//! SessionMiddleware -> SecurityTransform
//!     1. SessionAuthenticator resolves the principal from the session cookie
//!     2. PolicyAuthorizer evaluates the AccessPolicy, first matching rule wins
//!     3. PERMIT forwards, REQUIRE_AUTH redirects to the login page,
//!        FORBID goes to the AccessDeniedHandler (403)
//! ```

pub use authorizer::{
    AccessDecision, AccessPolicy, AccessPolicyBuilder, AccessRule, PolicyAuthorizer,
    PolicyError, Requirement, request_path,
};
pub use ant_matcher::AntMatcher;
pub use audit::{
    AuditLogger, InMemoryEventStore, LogHandler, SecurityEvent, SecurityEventHandler,
    SecurityEventType,
};
pub use config::{AccessDeniedHandler, Authenticator, Authorizer};
pub use crypto::{
    Argon2PasswordEncoder, BCryptPasswordEncoder, DefaultEncoder, DelegatingPasswordEncoder,
    EncodingError, NoOpPasswordEncoder, PasswordEncoder,
};
pub use csrf::{CsrfConfig, CsrfError, CsrfProtection, CsrfToken};
pub use denied::LoggingAccessDeniedHandler;
pub use extractor::{AuthenticatedUser, OptionalUser, SecurityExt};
pub use form_login::{FormLoginConfig, FormLoginService, LoginForm};
pub use headers::{FrameOptions, SecurityHeaders};
pub use jdbc::SqlUserDetailsManager;
pub use middleware::SecurityTransform;
pub use session::{SessionAuthenticator, SessionConfig, SessionError, SessionRegistry};
pub use user::{User, ROLE_PREFIX};
pub use user_details::{
    InMemoryUserDetailsService, UserDetailsAuthenticator, UserDetailsError, UserDetailsManager,
    UserDetailsService,
};

mod config;
mod extractor;
mod user;

pub mod ant_matcher;
pub mod audit;
pub mod authorizer;
pub mod crypto;
pub mod csrf;
pub mod denied;
pub mod form_login;
pub mod headers;
pub mod jdbc;
pub mod middleware;
pub mod session;
pub mod user_details;
