//! Extractors for the principal of the current request.
//!
//! # Spring Equivalent
//! `@AuthenticationPrincipal` / `SecurityContextHolder`
//!
//! The security middleware stores the resolved [`User`] in request
//! extensions; these types read it back in handlers.

use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use crate::http::error::AuthError;
use crate::http::security::User;

/// The authenticated principal.
///
/// # Errors
/// Fails with `401 Unauthorized` when no principal is present, which only
/// happens on routes the middleware does not guard.
///
/// ```ignore
/// async fn profile(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}!", user.get_username())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(User);

impl AuthenticatedUser {
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<User>().cloned() {
            Some(user) => ready(Ok(AuthenticatedUser(user))),
            None => ready(Err(AuthError::Unauthorized)),
        }
    }
}

/// The principal if there is one; never fails.
#[derive(Debug, Clone)]
pub struct OptionalUser(Option<User>);

impl OptionalUser {
    pub fn into_inner(self) -> Option<User> {
        self.0
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl Deref for OptionalUser {
    type Target = Option<User>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for OptionalUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalUser(req.extensions().get::<User>().cloned())))
    }
}

/// Principal checks directly on `HttpRequest`.
pub trait SecurityExt {
    fn get_user(&self) -> Option<User>;

    fn is_authenticated(&self) -> bool;

    fn has_role(&self, role: &str) -> bool;
}

impl SecurityExt for HttpRequest {
    fn get_user(&self) -> Option<User> {
        self.extensions().get::<User>().cloned()
    }

    fn is_authenticated(&self) -> bool {
        self.extensions().get::<User>().is_some()
    }

    fn has_role(&self, role: &str) -> bool {
        self.extensions()
            .get::<User>()
            .is_some_and(|u| u.has_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_authenticated_user_requires_principal() {
        let req = TestRequest::default().to_http_request();
        let result = AuthenticatedUser::extract(&req).await;
        assert_eq!(result.unwrap_err(), AuthError::Unauthorized);

        req.extensions_mut()
            .insert(User::principal("bugs").roles(&["USER".into()]));
        let user = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(user.get_username(), "bugs");
    }

    #[actix_web::test]
    async fn test_optional_user_and_ext() {
        let req = TestRequest::default().to_http_request();
        assert!(!OptionalUser::extract(&req).await.unwrap().is_authenticated());
        assert!(!req.is_authenticated());

        req.extensions_mut()
            .insert(User::principal("daffy").roles(&["MANAGER".into()]));
        assert!(OptionalUser::extract(&req).await.unwrap().is_authenticated());
        assert!(req.has_role("MANAGER"));
        assert!(!req.has_role("ADMIN"));
        assert_eq!(req.get_user().unwrap().get_username(), "daffy");
    }
}
