use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrlane::api::{create_router, AppState};
use ocrlane::config::Config;
use ocrlane::db::{Database, LibSqlSink, ResultSink};
use ocrlane::ocr::{OcrAdapter, OcrProvider};

#[derive(Parser)]
#[command(name = "ocrlane")]
#[command(about = "Image preprocessing and OCR service")]
struct Args {
    /// Address to bind (overrides OCRLANE_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides OCRLANE_PORT)
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ocrlane=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing database...");
    let db = Database::new(&config.database).await?;
    let sink: Arc<dyn ResultSink> = Arc::new(LibSqlSink::new(db));

    tracing::info!("Initializing OCR provider: {}...", config.ocr.model);
    let provider = OcrProvider::new(&config.ocr);
    if let Some(reason) = provider.unavailable_reason() {
        tracing::warn!(reason, "OCR unavailable - /process-image will answer 503");
    }
    let ocr: Arc<dyn OcrAdapter> = Arc::new(provider);

    let state = AppState::new(config.clone(), ocr, sink)?;
    let params = state.pipeline.params();
    tracing::info!(
        zoom_factor = params.zoom_factor,
        clahe_clip_limit = params.clahe_clip_limit,
        clahe_tiles = ?params.clahe_tile_grid,
        "Enhancement configured"
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("ocrlane starting on http://{}", addr);
    tracing::info!("  Upload form:  http://{}/", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("ocrlane stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
