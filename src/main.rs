use anyhow::Result;
use campus_voice::{create_router, AppState, Config};
use clap::Parser;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "campus-voice", about = "Voice session service for the CampusEats assistant")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/campus-voice")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; live sessions will fail to open");
    }

    info!("CampusEats voice service v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Live model: {}", cfg.live.model);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg, api_key);
    let app = create_router(state);

    info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
