use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use toolsite_backend::config::AppConfig;
use toolsite_backend::infrastructure::{database, filesystem, storage};
use toolsite_backend::services::mailer::Mailer;
use toolsite_backend::services::process::TokioProcessRunner;
use toolsite_backend::{AppState, create_app};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "toolsite-backend", version, about = "Tool website API server")]
struct Cli {
    /// Interface to bind, overrides HOST.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolsite_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting ToolWebsite API...");

    let mut config = AppConfig::from_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!(
        "🛡️  Upload limits: PDF={}MB x{}, Media={}MB",
        config.uploads.max_pdf_size / 1024 / 1024,
        config.uploads.max_pdf_files,
        config.uploads.max_media_size / 1024 / 1024
    );

    filesystem::prepare_directories(&config.server).await?;
    let db = database::setup_database(&config.database_url).await?;
    let storage_service = storage::setup_storage(&config.storage, &config.server).await?;
    let mailer = Mailer::new(&config.mail)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(
        db,
        config,
        storage_service,
        Arc::new(TokioProcessRunner),
        mailer,
    );
    info!(
        "🎨 Background removal cascade: {}",
        state.background.strategy_names().join(" -> ")
    );

    let app = create_app(state);

    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
