use anyhow::Context;
use bridge_events::bus::EventBus;
use bridge_serve::config::Config;
use bridge_serve::{AppState, notifier};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bridge", about = "Help requests and video calls for seniors")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Overrides BRIDGE_PORT.
        #[arg(long)]
        port: Option<u16>,
        /// Listen on all interfaces instead of loopback.
        #[arg(long)]
        public: bool,
    },
    /// Print the OpenAPI document.
    Openapi,
    /// Create or upgrade the database and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so RUST_LOG from .env applies.
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "failed to read .env");
        }
    }

    let cli = Cli::parse();
    let config = Config::from_env().context("reading configuration")?;
    match cli.command {
        Command::Serve { port, public } => serve(config, port, public).await,
        Command::Openapi => {
            println!("{}", bridge_serve::openapi::generate_spec());
            Ok(())
        }
        Command::Migrate => {
            ensure_parent_dir(&config.db_path)?;
            bridge_db::schema::open_and_migrate(&config.db_path)
                .with_context(|| format!("migrating {}", config.db_path))?;
            info!(db_path = %config.db_path, "database ready");
            Ok(())
        }
    }
}

async fn serve(config: Config, port: Option<u16>, public: bool) -> anyhow::Result<()> {
    ensure_parent_dir(&config.db_path)?;
    bridge_db::schema::open_and_migrate(&config.db_path)
        .with_context(|| format!("migrating {}", config.db_path))?;

    let provider_config = config.clone();
    let (rooms, classifier) =
        tokio::task::spawn_blocking(move || bridge_serve::build_providers(&provider_config))
            .await
            .context("building providers")??;

    let ip = if public {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    };
    let addr = SocketAddr::new(ip, port.unwrap_or(config.port));
    let (state, sender) = AppState::new(config, EventBus::new(1024), rooms, classifier);
    tokio::spawn(notifier::run(state.clone(), sender));
    bridge_serve::serve(state, addr)
        .await
        .context("serving http")
}

fn ensure_parent_dir(db_path: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}
