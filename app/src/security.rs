//! Security wiring for the demo application.
//!
//! # Spring Security Equivalent
//! ```java
//! http
//!     .authorizeHttpRequests(auth -> auth
//!         .requestMatchers("/user/**").hasAnyRole("USER", "MANAGER")
//!         .requestMatchers("/secured/**").hasAnyRole("USER", "MANAGER")
//!         .requestMatchers("/manager/**").hasRole("MANAGER")
//!         .requestMatchers("/h2-console/**").permitAll()
//!         .requestMatchers("/", "/**").permitAll())
//!     .formLogin(form -> form.loginPage("/login").defaultSuccessUrl("/secured", true).permitAll())
//!     .logout(logout -> logout.invalidateHttpSession(true).clearAuthentication(true).permitAll())
//!     .exceptionHandling(ex -> ex.accessDeniedHandler(accessDeniedHandler));
//! ```

use std::sync::Arc;

use actix_web::cookie::Key;
use anyhow::Context;
use warden_core::http::security::{
    AccessPolicy, AuditLogger, BCryptPasswordEncoder, CsrfConfig, FormLoginConfig,
    FormLoginService, FrameOptions, LoggingAccessDeniedHandler, PasswordEncoder, PolicyAuthorizer,
    PolicyError, SecurityHeaders, SessionAuthenticator, SessionConfig, SqlUserDetailsManager,
    User, UserDetailsAuthenticator, UserDetailsError, UserDetailsManager, UserDetailsService,
};

use crate::settings::SecuritySettings;

/// The access-control table, in evaluation order.
pub fn access_policy() -> Result<AccessPolicy, PolicyError> {
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
}

pub fn form_login_config() -> FormLoginConfig {
    FormLoginConfig::new()
        .login_page("/login")
        .default_success_url("/secured")
}

/// Demo accounts: `bugs` / `bunny` and `daffy` / `duck`.
///
/// Accounts that already exist are left untouched.
pub async fn seed_users(
    store: &SqlUserDetailsManager,
    encoder: &dyn PasswordEncoder,
) -> anyhow::Result<()> {
    let users = [
        ("bugs", "bunny", vec!["USER".to_string()]),
        ("daffy", "duck", vec!["USER".to_string(), "MANAGER".to_string()]),
    ];

    for (username, password, roles) in users {
        if store.user_exists(username).await? {
            continue;
        }
        let user = User::with_encoded_password(username, encoder.encode(password)?).roles(&roles);
        match store.create_user(&user).await {
            Ok(()) | Err(UserDetailsError::AlreadyExists) => {}
            Err(e) => return Err(e).context(format!("seeding user '{}'", username)),
        }
    }
    Ok(())
}

/// Every security component the application shares across workers.
#[derive(Clone)]
pub struct Security {
    pub store: SqlUserDetailsManager,
    pub form_login: FormLoginService,
    pub sessions: SessionAuthenticator,
    pub authorizer: PolicyAuthorizer,
    pub headers: SecurityHeaders,
    pub csrf: CsrfConfig,
    pub audit: AuditLogger,
    pub cookie_key: Key,
    pub cookie_secure: bool,
}

impl Security {
    /// Assembles the security configuration over an opened credential store.
    pub async fn init(
        settings: &SecuritySettings,
        store: SqlUserDetailsManager,
        audit: AuditLogger,
    ) -> anyhow::Result<Self> {
        store.create_schema().await.context("creating credential schema")?;

        let encoder = BCryptPasswordEncoder::with_cost(settings.bcrypt_cost);
        if settings.seed_users {
            seed_users(&store, &encoder).await?;
        }

        let credentials =
            UserDetailsAuthenticator::new(Arc::new(store.clone()), Arc::new(encoder))?;
        let sessions =
            SessionAuthenticator::new(SessionConfig::new().timeout(settings.session_timeout()));

        let form_login_config = form_login_config();
        let policy = access_policy()?.with_public_paths(&form_login_config.public_paths());
        let authorizer = PolicyAuthorizer::new(
            Arc::new(policy),
            form_login_config.get_login_page(),
            Arc::new(LoggingAccessDeniedHandler::new(audit.clone())),
        );

        let csrf = CsrfConfig::new().enabled(settings.csrf.enabled);
        let form_login = FormLoginService::new(credentials, sessions.clone(), form_login_config)
            .audit(audit.clone())
            .csrf(csrf.clone());

        if !settings.csrf.enabled {
            log::warn!("CSRF protection is disabled (security.csrf.enabled = false)");
        }
        if settings.frame_options == FrameOptions::Disabled {
            log::warn!("X-Frame-Options is disabled (security.frame_options = \"disabled\")");
        }
        if !settings.cookie_secure {
            log::warn!("Session cookie is sent over plain HTTP (security.cookie_secure = false)");
        }

        Ok(Security {
            store,
            form_login,
            sessions,
            authorizer,
            headers: SecurityHeaders::new().frame_options(settings.frame_options),
            csrf,
            audit,
            cookie_key: Key::generate(),
            cookie_secure: settings.cookie_secure,
        })
    }
}
