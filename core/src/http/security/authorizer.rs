//! Request-matcher based authorization.
//!
//! # Spring Security Equivalent
//! `RequestMatcherDelegatingAuthorizationManager` configured through
//! `authorizeHttpRequests(auth -> auth.requestMatchers(..).hasRole(..))`
//!
//! The policy is an ordered list of rules. [`AccessPolicy::evaluate`] walks
//! it in declared order and the first rule whose pattern matches decides.
//! It is a pure function of the path and the principal, so the full table
//! can be tested without a server.
//!
//! # Example
//! ```
//! use warden_core::http::security::authorizer::{AccessDecision, AccessPolicy};
//! use warden_core::http::security::User;
//!
//! let policy = AccessPolicy::builder()
//!     .request_matchers(&["/manager/**"]).has_role("MANAGER")
//!     .request_matchers(&["/**"]).permit_all()
//!     .build()
//!     .unwrap();
//!
//! let bugs = User::principal("bugs").roles(&["USER".into()]);
//! assert_eq!(policy.evaluate("/manager/reports", Some(&bugs)), AccessDecision::Forbid);
//! assert_eq!(policy.evaluate("/manager/reports", None), AccessDecision::RequireAuth);
//! assert_eq!(policy.evaluate("/about", None), AccessDecision::Permit);
//! ```

use std::fmt;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{http, Error, HttpResponse};
use derive_more::Display;
use futures_util::future::LocalBoxFuture;

use crate::http::security::ant_matcher::AntMatcher;
use crate::http::security::config::{AccessDeniedHandler, Authorizer};
use crate::http::security::user::User;

/// Outcome of evaluating the policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Forward to the handler.
    Permit,
    /// No principal on a protected path: send to the login page.
    RequireAuth,
    /// Principal present but lacking the required grant.
    Forbid,
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDecision::Permit => write!(f, "PERMIT"),
            AccessDecision::RequireAuth => write!(f, "REQUIRE_AUTH"),
            AccessDecision::Forbid => write!(f, "FORBID"),
        }
    }
}

/// What a rule demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// `permitAll()`
    PermitAll,
    /// `denyAll()`
    DenyAll,
    /// `authenticated()`
    Authenticated,
    /// `hasAnyRole(..)`
    AnyRole(Vec<String>),
    /// `hasAnyAuthority(..)`
    AnyAuthority(Vec<String>),
}

impl Requirement {
    fn decide(&self, principal: Option<&User>) -> AccessDecision {
        let user = match (self, principal) {
            (Requirement::PermitAll, _) => return AccessDecision::Permit,
            (_, None) => return AccessDecision::RequireAuth,
            (_, Some(user)) => user,
        };

        let granted = match self {
            Requirement::PermitAll | Requirement::Authenticated => true,
            Requirement::DenyAll => false,
            Requirement::AnyRole(roles) => user.has_any_role(roles),
            Requirement::AnyAuthority(authorities) => user.has_any_authority(authorities),
        };

        if granted {
            AccessDecision::Permit
        } else {
            AccessDecision::Forbid
        }
    }
}

/// One entry of the policy: a set of patterns sharing a requirement.
#[derive(Debug, Clone)]
pub struct AccessRule {
    matchers: Vec<AntMatcher>,
    requirement: Requirement,
    order: usize,
}

impl AccessRule {
    pub fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Position in declaration order, starting at 0.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(|m| m.pattern())
    }
}

/// Error raised while building a policy.
#[derive(Debug, Display, derive_more::Error, PartialEq, Eq)]
pub enum PolicyError {
    /// A later pattern can never match because an earlier one covers it.
    #[display("pattern '{pattern}' is unreachable: already covered by '{covered_by}'")]
    ShadowedRule { pattern: String, covered_by: String },
    /// `request_matchers` was called with no patterns.
    #[display("rule {order} has no patterns")]
    EmptyRule { order: usize },
}

/// An ordered, immutable access-control table.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder { rules: Vec::new() }
    }

    /// First matching rule decides; a path no rule matches is permitted.
    pub fn evaluate(&self, path: &str, principal: Option<&User>) -> AccessDecision {
        match self.matching_rule(path) {
            Some(rule) => rule.requirement.decide(principal),
            None => AccessDecision::Permit,
        }
    }

    pub fn matching_rule(&self, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Returns a copy with `paths` permitted ahead of every existing rule.
    ///
    /// Used for the login and logout endpoints, which stay reachable whatever
    /// the table says.
    pub fn with_public_paths(&self, paths: &[&str]) -> AccessPolicy {
        let mut rules = Vec::with_capacity(self.rules.len() + 1);
        rules.push(AccessRule {
            matchers: paths.iter().map(|p| AntMatcher::new(p)).collect(),
            requirement: Requirement::PermitAll,
            order: 0,
        });
        rules.extend(self.rules.iter().cloned().map(|mut rule| {
            rule.order += 1;
            rule
        }));
        AccessPolicy { rules }
    }
}

/// Builder mirroring `authorizeHttpRequests` chaining.
pub struct AccessPolicyBuilder {
    rules: Vec<(Vec<String>, Requirement)>,
}

/// Pending rule returned by [`AccessPolicyBuilder::request_matchers`].
pub struct RuleBuilder {
    parent: AccessPolicyBuilder,
    patterns: Vec<String>,
}

impl AccessPolicyBuilder {
    /// Starts a rule for the given patterns; finish it with a requirement.
    pub fn request_matchers(self, patterns: &[&str]) -> RuleBuilder {
        RuleBuilder {
            parent: self,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Compiles the rules, rejecting any pattern an earlier rule already covers.
    pub fn build(self) -> Result<AccessPolicy, PolicyError> {
        let mut rules: Vec<AccessRule> = Vec::with_capacity(self.rules.len());

        for (order, (patterns, requirement)) in self.rules.into_iter().enumerate() {
            if patterns.is_empty() {
                return Err(PolicyError::EmptyRule { order });
            }
            let matchers: Vec<AntMatcher> = patterns.iter().map(|p| AntMatcher::new(p)).collect();

            for matcher in &matchers {
                let mut earlier = rules.iter().flat_map(|r| r.matchers.iter());
                if let Some(cover) = earlier.find(|e| e.covers(matcher)) {
                    return Err(PolicyError::ShadowedRule {
                        pattern: matcher.pattern().to_string(),
                        covered_by: cover.pattern().to_string(),
                    });
                }
            }

            rules.push(AccessRule {
                matchers,
                requirement,
                order,
            });
        }

        Ok(AccessPolicy { rules })
    }
}

impl RuleBuilder {
    fn finish(mut self, requirement: Requirement) -> AccessPolicyBuilder {
        self.parent.rules.push((self.patterns, requirement));
        self.parent
    }

    pub fn permit_all(self) -> AccessPolicyBuilder {
        self.finish(Requirement::PermitAll)
    }

    pub fn deny_all(self) -> AccessPolicyBuilder {
        self.finish(Requirement::DenyAll)
    }

    pub fn authenticated(self) -> AccessPolicyBuilder {
        self.finish(Requirement::Authenticated)
    }

    pub fn has_role(self, role: &str) -> AccessPolicyBuilder {
        self.has_any_role(&[role])
    }

    pub fn has_any_role(self, roles: &[&str]) -> AccessPolicyBuilder {
        self.finish(Requirement::AnyRole(
            roles.iter().map(|r| r.to_string()).collect(),
        ))
    }

    pub fn has_authority(self, authority: &str) -> AccessPolicyBuilder {
        self.has_any_authority(&[authority])
    }

    pub fn has_any_authority(self, authorities: &[&str]) -> AccessPolicyBuilder {
        self.finish(Requirement::AnyAuthority(
            authorities.iter().map(|a| a.to_string()).collect(),
        ))
    }
}

// =============================================================================
// Policy Authorizer
// =============================================================================

/// [`Authorizer`] that applies an [`AccessPolicy`] inside the security middleware.
///
/// - PERMIT forwards to the inner service.
/// - REQUIRE_AUTH answers `302 Found` to the login page.
/// - FORBID hands the request to the injected [`AccessDeniedHandler`].
#[derive(Clone)]
pub struct PolicyAuthorizer {
    policy: Arc<AccessPolicy>,
    login_url: String,
    denied_handler: Arc<dyn AccessDeniedHandler>,
}

impl PolicyAuthorizer {
    pub fn new(
        policy: Arc<AccessPolicy>,
        login_url: &str,
        denied_handler: Arc<dyn AccessDeniedHandler>,
    ) -> Self {
        PolicyAuthorizer {
            policy,
            login_url: login_url.to_string(),
            denied_handler,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
}

/// Path the router dispatches on.
///
/// Percent-encoded octets are decoded except reserved ones such as `%2F`, so
/// `/%6danager/reports` is evaluated as `/manager/reports`.
pub fn request_path(req: &ServiceRequest) -> &str {
    req.match_info().as_str()
}

impl<B: 'static> Authorizer<B> for PolicyAuthorizer {
    fn process(
        &self,
        req: ServiceRequest,
        user: Option<&User>,
        next: impl FnOnce(ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
            + 'static,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
        let path = request_path(&req);
        let decision = self.policy.evaluate(path, user);
        log::debug!("{} {} -> {}", req.method(), path, decision);

        match (decision, user) {
            (AccessDecision::Permit, _) => Box::pin(async move {
                let res = next(req).await?;
                Ok(res.map_into_left_body())
            }),
            (AccessDecision::Forbid, Some(user)) => {
                let response = self.denied_handler.handle(&req, user);
                Box::pin(async move { Ok(req.into_response(response.map_into_right_body())) })
            }
            (AccessDecision::RequireAuth, _) | (AccessDecision::Forbid, None) => {
                let login_url = self.login_url.clone();
                Box::pin(async move {
                    Ok(req.into_response(
                        HttpResponse::Found()
                            .append_header((http::header::LOCATION, login_url))
                            .finish()
                            .map_into_right_body(),
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn policy() -> AccessPolicy {
        AccessPolicy::builder()
            .request_matchers(&["/user/**"])
            .has_any_role(&["USER", "MANAGER"])
            .request_matchers(&["/secured/**"])
            .has_any_role(&["USER", "MANAGER"])
            .request_matchers(&["/manager/**"])
            .has_role("MANAGER")
            .request_matchers(&["/h2-console/**"])
            .permit_all()
            .request_matchers(&["/", "/**"])
            .permit_all()
            .build()
            .unwrap()
    }

    fn bugs() -> User {
        User::principal("bugs").roles(&["USER".into()])
    }

    fn daffy() -> User {
        User::principal("daffy").roles(&["USER".into(), "MANAGER".into()])
    }

    #[test]
    fn test_request_path_is_decoded() {
        let req = TestRequest::with_uri("/%6danager/%72eports").to_srv_request();
        assert_eq!(request_path(&req), "/manager/reports");

        let req = TestRequest::with_uri("/manager%2Freports").to_srv_request();
        assert_eq!(request_path(&req), "/manager%2Freports");
    }

    #[test]
    fn test_manager_tree_requires_manager() {
        let policy = policy();
        for path in ["/manager", "/manager/reports", "/manager/a/b/c"] {
            assert_eq!(policy.evaluate(path, Some(&bugs())), AccessDecision::Forbid);
            assert_eq!(policy.evaluate(path, Some(&daffy())), AccessDecision::Permit);
            assert_eq!(policy.evaluate(path, None), AccessDecision::RequireAuth);
        }
    }

    #[test]
    fn test_user_and_secured_trees() {
        let policy = policy();
        let manager_only = User::principal("boss").roles(&["MANAGER".into()]);
        let guest = User::principal("guest").roles(&["GUEST".into()]);

        for path in ["/user/profile", "/secured", "/secured/home"] {
            assert_eq!(policy.evaluate(path, Some(&bugs())), AccessDecision::Permit);
            assert_eq!(policy.evaluate(path, Some(&manager_only)), AccessDecision::Permit);
            assert_eq!(policy.evaluate(path, Some(&guest)), AccessDecision::Forbid);
            assert_eq!(policy.evaluate(path, None), AccessDecision::RequireAuth);
        }
    }

    #[test]
    fn test_open_trees() {
        let policy = policy();
        for path in ["/", "/h2-console", "/h2-console/login.do", "/about", "/users"] {
            assert_eq!(policy.evaluate(path, None), AccessDecision::Permit);
            assert_eq!(policy.evaluate(path, Some(&bugs())), AccessDecision::Permit);
        }
    }

    #[test]
    fn test_first_match_wins() {
        let policy = policy();
        let rule = policy.matching_rule("/manager/reports").unwrap();
        assert_eq!(rule.order(), 2);
        assert_eq!(rule.requirement(), &Requirement::AnyRole(vec!["MANAGER".into()]));
    }

    #[test]
    fn test_unmatched_path_is_permitted() {
        let policy = AccessPolicy::builder()
            .request_matchers(&["/manager/**"])
            .has_role("MANAGER")
            .build()
            .unwrap();

        assert_eq!(policy.evaluate("/elsewhere", None), AccessDecision::Permit);
    }

    #[test]
    fn test_catch_all_first_is_rejected() {
        let result = AccessPolicy::builder()
            .request_matchers(&["/**"])
            .permit_all()
            .request_matchers(&["/manager/**"])
            .has_role("MANAGER")
            .build();

        assert_eq!(
            result.unwrap_err(),
            PolicyError::ShadowedRule {
                pattern: "/manager/**".into(),
                covered_by: "/**".into(),
            }
        );
    }

    #[test]
    fn test_broader_subtree_first_is_rejected() {
        let result = AccessPolicy::builder()
            .request_matchers(&["/manager/**"])
            .has_role("MANAGER")
            .request_matchers(&["/manager/public"])
            .permit_all()
            .build();

        assert!(matches!(result, Err(PolicyError::ShadowedRule { .. })));
    }

    #[test]
    fn test_empty_rule_is_rejected() {
        let result = AccessPolicy::builder().request_matchers(&[]).permit_all().build();
        assert_eq!(result.unwrap_err(), PolicyError::EmptyRule { order: 0 });
    }

    #[test]
    fn test_deny_all_and_authenticated() {
        let policy = AccessPolicy::builder()
            .request_matchers(&["/closed/**"])
            .deny_all()
            .request_matchers(&["/members/**"])
            .authenticated()
            .build()
            .unwrap();

        assert_eq!(policy.evaluate("/closed/x", Some(&daffy())), AccessDecision::Forbid);
        assert_eq!(policy.evaluate("/closed/x", None), AccessDecision::RequireAuth);
        assert_eq!(policy.evaluate("/members/x", Some(&bugs())), AccessDecision::Permit);
        assert_eq!(policy.evaluate("/members/x", None), AccessDecision::RequireAuth);
    }

    #[test]
    fn test_authority_requirement() {
        let policy = AccessPolicy::builder()
            .request_matchers(&["/reports/**"])
            .has_authority("reports:read")
            .build()
            .unwrap();
        let reader = User::principal("r").authorities(&["reports:read".into()]);

        assert_eq!(policy.evaluate("/reports/q1", Some(&reader)), AccessDecision::Permit);
        assert_eq!(policy.evaluate("/reports/q1", Some(&bugs())), AccessDecision::Forbid);
    }

    #[test]
    fn test_public_paths_come_first() {
        let policy = AccessPolicy::builder()
            .request_matchers(&["/**"])
            .authenticated()
            .build()
            .unwrap()
            .with_public_paths(&["/login", "/logout"]);

        assert_eq!(policy.evaluate("/login", None), AccessDecision::Permit);
        assert_eq!(policy.evaluate("/logout", None), AccessDecision::Permit);
        assert_eq!(policy.evaluate("/home", None), AccessDecision::RequireAuth);
        assert_eq!(policy.rules()[1].order(), 1);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(AccessDecision::Permit.to_string(), "PERMIT");
        assert_eq!(AccessDecision::RequireAuth.to_string(), "REQUIRE_AUTH");
        assert_eq!(AccessDecision::Forbid.to_string(), "FORBID");
    }
}
