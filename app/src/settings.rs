use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use warden_core::http::security::FrameOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsrfSettings {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecuritySettings {
    pub bcrypt_cost: u32,
    pub session_timeout_secs: u64,
    /// Installs the demo accounts at startup.
    pub seed_users: bool,
    pub cookie_secure: bool,
    pub frame_options: FrameOptions,
    pub csrf: CsrfSettings,
}

impl SecuritySettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub security: SecuritySettings,
}

impl Settings {
    /// Layers `default` → `{run_mode}` → `local` files from `config_dir`,
    /// then `WARDEN__SECTION__KEY` environment variables.
    pub fn new(config_dir: &Path) -> Result<Self, ConfigError> {
        let run_mode = env::var("WARDEN_RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| File::from(config_dir.join(name));

        let s = Config::builder()
            .set_default("server.bind_address", "127.0.0.1:8080")?
            .set_default("database.url", "sqlite::memory:")?
            .set_default("database.max_connections", 1)?
            .set_default("security.bcrypt_cost", 10)?
            .set_default("security.session_timeout_secs", 1800)?
            .set_default("security.seed_users", false)?
            .set_default("security.cookie_secure", true)?
            .set_default("security.frame_options", "deny")?
            .set_default("security.csrf.enabled", true)?
            .add_source(file("default").required(false))
            .add_source(file(&run_mode).required(false))
            .add_source(file("local").required(false))
            .add_source(
                Environment::with_prefix("WARDEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
