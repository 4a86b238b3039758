//! Configuration traits for authentication and authorization.
//!
//! # Spring Equivalent
//! `AuthenticationProvider`, `AuthorizationManager` and `AccessDeniedHandler` interfaces

use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{Error, HttpResponse};
use futures_util::future::LocalBoxFuture;

use crate::http::security::user::User;

/// Trait for resolving the principal of an HTTP request.
///
/// # Spring Equivalent
/// `SecurityContextRepository.loadContext`
///
/// Returns an owned `User` so it can be stored in request extensions
/// for access by handlers.
pub trait Authenticator {
    /// Returns the principal bound to the request, or `None` for anonymous.
    fn get_user(&self, req: &ServiceRequest) -> Option<User>;
}

/// Trait for deciding whether a principal can access a resource.
///
/// # Spring Equivalent
/// `AuthorizationManager`
///
/// The `process` method returns a boxed future that resolves to:
/// - `EitherBody::left()` when forwarding to the inner service
/// - `EitherBody::right()` for responses produced here (redirects, 403)
pub trait Authorizer<B> {
    /// Processes the authorization decision.
    ///
    /// # Arguments
    /// * `req` - The incoming request
    /// * `user` - The resolved principal (if any)
    /// * `next` - Closure to call the next service in the chain
    fn process(
        &self,
        req: ServiceRequest,
        user: Option<&User>,
        next: impl FnOnce(ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
            + 'static,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>>;
}

/// Produces the response for an authenticated principal that lacks a grant.
///
/// # Spring Equivalent
/// `AccessDeniedHandler`
pub trait AccessDeniedHandler: Send + Sync {
    fn handle(&self, req: &ServiceRequest, user: &User) -> HttpResponse;
}
