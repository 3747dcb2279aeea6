mod app;
mod widgets;

use anyhow::{Context, Result};
use std::{
    env,
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use portal_core::{
    api::ApiClient,
    config::{self, AppConfig},
    session::{SessionSettings, SessionState},
    store::CookieJar,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let jar = CookieJar::open(&config.cookie_path);
    tracing::debug!(path = %jar.path().display(), "Using cookie jar");
    let session = SessionState::initialize(Arc::new(jar), SessionSettings::from(&config));
    let api = ApiClient::new(config.clone())?;

    let initial_route = env::args().nth(1).unwrap_or_else(|| "/".to_string());
    tracing::info!(route = %initial_route, "Starting portal");

    let mut app = app::PortalApp::new(config, session, api, &initial_route);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("portal.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal is owned by the UI, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
