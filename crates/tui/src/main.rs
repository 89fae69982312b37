mod app;
mod countdown_font;

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use bargain_core::{
    backend::{BargainBackend, SimulatedBackend},
    config::{self, AppConfig},
    timer::{Clock, SystemClock},
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let backend: Arc<dyn BargainBackend> = match config.backend.seed {
        Some(seed) => Arc::new(SimulatedBackend::with_seed(seed)),
        None => Arc::new(SimulatedBackend::new()),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut app = app::BargainApp::new(config, clock, backend)?;
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("bargain.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Only a file layer: stdout belongs to the alternate screen.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
