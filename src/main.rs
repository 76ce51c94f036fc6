//! Rainfall API entrypoint: load config and model, then serve until Ctrl+C.
//! A missing model is not fatal; health and features stay up and predict answers 503.

use rainfall_api::{
    api::{self, AppState},
    config::ServiceConfig,
    inference::{IntensityScale, PredictionService},
    logging::StructuredLogger,
    model::ModelHost,
};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("RAINFALL_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let mut config = ServiceConfig::load(&config_path)?;
    config.apply_env_overrides()?;

    StructuredLogger::init(&config.log);

    info!(
        config = %config_path.display(),
        model_path = %config.model_path.display(),
        "rainfall API starting"
    );

    let scale = IntensityScale::new(config.intensity)?;
    let host = ModelHost::load(&config.model_path);
    let state = AppState::new(PredictionService::new(host, scale));

    let (stop_tx, mut stop_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    })?;
    let shutdown = async move {
        let _ = stop_rx.changed().await;
        info!("shutdown requested");
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(api::start_server(state, &config.web, &config.bind_addr(), shutdown))?;

    info!("rainfall API stopped");
    Ok(())
}
