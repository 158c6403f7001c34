use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use doc_translator::config::Config;
use doc_translator::routes;
use doc_translator::state::AppState;

fn load_config() -> Config {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    let config_paths: Vec<PathBuf> = vec![
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from),
        Some(PathBuf::from("conf.yaml")),
        Some(PathBuf::from("conf.json")),
        Some(exe_dir.join("conf.yaml")),
    ]
    .into_iter()
    .flatten()
    .collect();

    for path in &config_paths {
        match Config::load(path) {
            Ok(config) => {
                info!("Loaded configuration from: {}", path.display());
                return config;
            }
            Err(e) => debug!("Failed to load config from {}: {}", path.display(), e),
        }
    }

    warn!("No config file found (tried {:?}), using defaults", config_paths);
    Config::default()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("doc_translator=debug,tower_http=debug")),
        )
        .init();

    let config = load_config();
    let system_config = config.system_config.clone();

    let app_state = AppState::new(config)?;
    info!(
        "Using translator {} with scratch directory {}",
        app_state.config.translator_config.provider,
        system_config.temp_dir.display()
    );

    let app = routes::app(app_state);

    let addr: SocketAddr = format!("{}:{}", system_config.host, system_config.port).parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
