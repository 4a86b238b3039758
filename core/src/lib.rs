//! # warden-core
//!
//! Form-login authentication and path-based role authorization for
//! [Actix Web](https://actix.rs), modeled on Spring Security.
//!
//! The pieces compose the same way a `SecurityFilterChain` does:
//!
//! - a [`UserDetailsService`](http::security::UserDetailsService) loads accounts
//!   from a credential store (SQL or in memory)
//! - a [`FormLoginService`](http::security::FormLoginService) verifies submitted
//!   credentials and turns them into a server-side session
//! - a [`SessionAuthenticator`](http::security::SessionAuthenticator) resolves the
//!   principal of every request from its session cookie
//! - an [`AccessPolicy`](http::security::AccessPolicy) decides, first match wins,
//!   whether the request is permitted, needs a login, or is forbidden
//!
//! [`SecurityTransform`](http::security::SecurityTransform) wires the
//! authenticator and authorizer in front of every route.

pub mod http;
