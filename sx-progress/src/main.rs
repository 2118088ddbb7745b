//! sx-progress - Progression service entry point
//!
//! `sx-progress` (or `sx-progress serve`) runs the HTTP service.
//! `sx-progress import-course <file>` loads a TOML course document into the
//! database and exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sx_common::config::{ConfigOverrides, ServiceConfig};
use sx_progress::db::{import_course, CourseDocument};
use sx_progress::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for sx-progress
#[derive(Parser, Debug)]
#[command(name = "sx-progress")]
#[command(about = "Learner progression service for Syntaxia")]
#[command(version)]
struct Args {
    /// Config file (default: platform config dir, then /etc/syntaxia)
    #[arg(short, long, env = "SX_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "SX_DATABASE")]
    database: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "SX_BIND_ADDR")]
    bind: Option<String>,

    /// Tracing level or filter directive
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Import a course content tree from a TOML document
    ImportCourse {
        /// Path to the course document
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: args.config,
        bind_addr: args.bind,
        database_path: args.database,
        log_level: args.log_level,
    })
    .context("Failed to resolve configuration")?;

    init_tracing(&config.log_level);

    info!(
        "Starting Syntaxia progression service (sx-progress) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config.config_file {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }
    info!("Database path: {}", config.database_path.display());

    let pool = sx_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, &config.bind_addr).await,
        Command::ImportCourse { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document = CourseDocument::from_toml(&source)?;
            let imported = import_course(&pool, &document).await?;
            info!(
                "Imported '{}' as course {} ({} units, {} lessons, {} challenges)",
                document.title,
                imported.course_id,
                imported.units,
                imported.lessons,
                imported.challenges
            );
            Ok(())
        }
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    let default_filter = format!(
        "sx_progress={level},sx_common={level},tower_http={level}",
        level = log_level
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(pool: sqlx::SqlitePool, bind_addr: &str) -> Result<()> {
    let app = build_router(AppState::new(pool));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("sx-progress listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
