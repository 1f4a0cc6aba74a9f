//! scribe: collaborative plain-text editor server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe::{
    server::{self, AppState},
    Config, Coordinator, Document,
};

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Collaborative plain-text editor server")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "SCRIBE_CONFIG", default_value = "scribe.toml")]
    config: PathBuf,

    /// Address to listen on (overrides config file)
    #[arg(long, env = "SCRIBE_LISTEN")]
    listen: Option<SocketAddr>,

    /// Site label for minted identifiers (overrides config file)
    #[arg(long, env = "SCRIBE_SITE")]
    site: Option<String>,

    /// Directory served under /static (overrides config file)
    #[arg(long, env = "SCRIBE_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SCRIBE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("scribe={},info", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scribe");
    info!("Config file: {}", cli.config.display());

    let mut config = Config::load_or_default(&cli.config)?;

    // Apply CLI overrides
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(site) = cli.site {
        config.sync.site = site;
    }
    if let Some(static_dir) = cli.static_dir {
        config.server.static_dir = static_dir;
    }
    config.validate()?;

    info!("Site: {}", config.sync.site);
    info!("Static dir: {}", config.server.static_dir.display());
    info!("Outbox capacity: {}", config.sync.outbox_capacity);

    let coordinator = Arc::new(Coordinator::new(Document::new(), &config.sync));
    let app = server::create_router(AppState::new(coordinator), &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    server::serve(listener, app).await?;

    Ok(())
}
