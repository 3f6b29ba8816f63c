//! Fact-check server
//!
//! Backend for the highlight fact checker. Provides REST endpoints for:
//!
//! - Claim verification through a web-search-capable evidence engine
//! - The claim relay: trigger, session state and a push stream for panels
//!
//! ## Architecture
//!
//! `POST /factcheck` hands the claim to the [`orchestrator`], which builds a
//! bounded instruction pair from [`prompt`], calls the [`engine`], and pulls
//! a normalized verdict out of the reply with [`extract`].

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod engine;
mod error;
mod extract;
mod orchestrator;
mod prompt;
mod state;
#[cfg(test)]
mod tests;

use state::{AppState, EngineSettings};

/// Command-line arguments for the fact-check server
#[derive(Parser, Debug)]
#[command(name = "factcheck-server")]
#[command(about = "Fact-check backend for highlighted claims")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8787")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Evidence engine API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Evidence engine model
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-5")]
    model: String,

    /// Evidence engine endpoint
    #[arg(
        long,
        env = "EVIDENCE_ENGINE_URL",
        default_value = "https://api.openai.com/v1/responses"
    )]
    engine_url: String,

    /// Evidence engine timeout in seconds
    #[arg(long, default_value = "90")]
    engine_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_settings(EngineSettings {
        api_key: args.api_key,
        model: args.model,
        endpoint: args.engine_url,
        timeout: Duration::from_secs(args.engine_timeout_secs),
    })?;

    let app = api::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Fact-check backend running on http://{}", addr);
    info!("Evidence engine timeout: {}s", args.engine_timeout_secs);

    axum::serve(listener, app).await?;

    Ok(())
}
