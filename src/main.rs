use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use ragway::{gateway, store, Config};

/// `ragway` — conversation-session gateway for a question-answering backend.
#[derive(Parser, Debug)]
#[command(name = "ragway")]
#[command(version)]
#[command(about = "Session gateway in front of a question-answering backend.", long_about = None)]
struct Cli {
    /// Path to config.toml (default: ~/.ragway/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    #[command(long_about = "\
Start the HTTP gateway.

Serves session creation, query submission, history reads, and session
deletion over REST, backed by the configured transcript store.

Examples:
  ragway gateway                       # config/env defaults
  ragway gateway --port 8080
  REDIS_URL=redis://cache:6379 ragway gateway")]
    Gateway {
        /// Override the configured bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
    },
    /// Show the resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load(cli.config.as_deref()).await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Gateway { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            info!("Starting ragway gateway on {host}:{port}");
            gateway::run_gateway(&host, port, &config).await
        }

        Commands::Status => {
            // Validate the store selection so a typo shows up here, not at
            // gateway start.
            let store = store::create_store(&config.store)?;

            println!("ragway status");
            println!();
            println!("Version:      {}", env!("CARGO_PKG_VERSION"));
            println!(
                "Config:       {}",
                cli.config
                    .or_else(Config::default_path)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(defaults)".to_string())
            );
            println!();
            println!("Gateway:      {}:{}", config.gateway.host, config.gateway.port);
            println!("Store:        {} ({})", store.name(), config.store.url);
            println!("Key prefix:   {}", config.store.key_prefix);
            println!("Session TTL:  {}s (sliding)", config.store.ttl_secs);
            println!("Backend:      {}", config.backend.url);
            Ok(())
        }
    }
}
