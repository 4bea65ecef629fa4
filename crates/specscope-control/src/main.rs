//! SpecScope prediction service
//!
//! Single binary that serves:
//! - `POST /predict` over the trained interference classifier
//! - simulated spectrum views for the browser front end

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use specscope_common::config::SpecscopeConfig;
use specscope_common::model::RandomForest;
use specscope_common::predict::Predictor;
use specscope_common::simulate::{DataSource, SubprocessSimulator, SyntheticSpectrum};
use specscope_control::{api, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ──────────────────────────────────────────────────
    let config_path = std::env::var("SPECSCOPE_CONFIG").ok().map(PathBuf::from);
    let mut config = SpecscopeConfig::load_or_default(config_path.as_deref())?;
    config.apply_env(
        std::env::var("LISTEN_ADDR").ok(),
        std::env::var("MODEL_PATH").ok(),
    )?;

    // ── Model ───────────────────────────────────────────────────
    let model = RandomForest::load(&config.model_path)
        .map_err(|e| anyhow::anyhow!("cannot load model {}: {e}", config.model_path.display()))?;
    let predictor = Predictor::from_classifier(model);

    // ── Data source ─────────────────────────────────────────────
    let source: Arc<dyn DataSource> = if config.simulator.command.is_empty() {
        Arc::new(SyntheticSpectrum::default())
    } else {
        Arc::new(SubprocessSimulator::from_command(
            &config.simulator.command,
            &config.simulator.output,
        )?)
    };

    // ── Router ──────────────────────────────────────────────────
    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state::AppState::new(predictor, source));

    // ── Listen ──────────────────────────────────────────────────
    let addr = config.listen;
    tracing::info!("specscope-api listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
