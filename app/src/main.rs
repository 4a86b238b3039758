use std::path::PathBuf;
use std::time::Duration;

use actix_web::HttpServer;
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use warden_app::security::Security;
use warden_app::settings::Settings;
use warden_core::http::security::{AuditLogger, SqlUserDetailsManager};

#[derive(Parser, Debug)]
#[command(version, about = "Form-login gateway demo")]
struct Args {
    /// Directory holding default.toml and the run-mode overrides
    #[arg(long, env = "WARDEN_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Overrides server.bind_address
    #[arg(long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    let mut settings = Settings::new(&args.config_dir).context("loading configuration")?;
    if let Some(bind) = args.bind {
        settings.server.bind_address = bind;
    }

    let store = SqlUserDetailsManager::connect(
        &settings.database.url,
        settings.database.max_connections,
    )
    .await
    .with_context(|| format!("connecting to {}", settings.database.url))?;

    let security = Security::init(&settings.security, store, AuditLogger::with_log()).await?;

    let registry = security.sessions.registry().clone();
    actix_web::rt::spawn(async move {
        let mut tick = actix_web::rt::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let purged = registry.purge_expired();
            if purged > 0 {
                log::debug!("Purged {} idle sessions", purged);
            }
        }
    });

    log::info!("Listening on http://{}", settings.server.bind_address);

    let bind_address = settings.server.bind_address.clone();
    HttpServer::new(move || warden_app::create_app(&settings, &security))
        .bind(&bind_address)
        .with_context(|| format!("binding {}", bind_address))?
        .run()
        .await?;

    Ok(())
}
