use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zoppler_radar_ai::config::config_search_paths;
use zoppler_radar_ai::{build_router, AppConfig, AppState, BackendKind};

#[derive(Parser)]
#[command(
    name = "zoppler-radar-ai",
    about = "Zoppler Radar AI chat relay: forwards the chat page to Anthropic or a local Ollama server",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend to relay to: anthropic or ollama (overrides config)
    #[arg(long, env = "ZOPPLER_BACKEND")]
    backend: Option<String>,

    /// Directory holding index.html and the static assets (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zoppler_radar_ai=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = AppConfig::find_and_load(cli.config.as_deref())?;

    if let Some(ref name) = cli.backend {
        config.backend.kind = BackendKind::from_name(name).ok_or_else(|| {
            anyhow::anyhow!("Unknown backend '{name}'. Known backends: anthropic, ollama")
        })?;
    }
    config.apply_env();

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.static_dir {
        config.static_dir = dir;
    }

    info!("Zoppler Radar AI v{}", env!("CARGO_PKG_VERSION"));
    info!("  Backend:   {}", config.backend.kind);
    info!("  Base URL:  {}", config.effective_base_url());
    info!("  Model:     {}", config.effective_model());
    info!("  Timeout:   {}s", config.timeout_secs);
    info!("  Static:    {}", config.static_dir.display());
    if let Some(key_env) = config.api_key_env() {
        if std::env::var(&key_env).is_err() {
            tracing::warn!("{key_env} is not set; chat requests will fail until it is");
        }
    }

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState::new(config)?);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
