use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;

use turtlescape::{
    config::{AppConfig, ConfigLoader},
    dashboard::Dashboard,
    geo::FishermanUpdate,
    identity::IdentityClient,
    logging,
    map::MemoryMap,
    store::GeoStateStore,
    tracker::{initial_state, SystemClock},
    web,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "TurtleScape fisherman risk map")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "config/turtlescape.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the dashboard
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Register a user with the identity service
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        phone: String,
    },
    /// Log in against the identity service
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        phone: String,
    },
    /// Print the status panel for the configured start state, optionally
    /// merged with an update
    Status {
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
        #[arg(long)]
        hour: Option<u8>,
        #[arg(long)]
        month: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::new(".").load_or_default(&cli.config)?;
    logging::init(&config.logging.level);

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            web::run(config).await
        }
        Command::Register { username, phone } => {
            let client = IdentityClient::new(config.identity.base_url.as_str());
            match client.register(&username, &phone).await {
                Ok(reply) => {
                    println!("{}", reply.message);
                    Ok(())
                }
                Err(err) => {
                    error!("registration failed: {err}");
                    anyhow::bail!(err.user_message())
                }
            }
        }
        Command::Login { username, phone } => {
            let client = IdentityClient::new(config.identity.base_url.as_str());
            match client.login(&username, &phone).await {
                Ok(reply) => {
                    println!("{}", reply.banner());
                    Ok(())
                }
                Err(err) => {
                    error!("login failed: {err}");
                    anyhow::bail!(err.user_message())
                }
            }
        }
        Command::Status {
            latitude,
            longitude,
            hour,
            month,
        } => {
            let update = FishermanUpdate {
                latitude,
                longitude,
                hour,
                month,
            };
            print_status(&config, update)
        }
    }
}

fn print_status(config: &AppConfig, update: FishermanUpdate) -> Result<()> {
    let store = GeoStateStore::new(
        initial_state(config, &SystemClock),
        config.risk_zones.clone(),
    )?;
    let mut backend = MemoryMap::new();
    backend.mount(config.map.container.as_str());
    let mut dashboard = Dashboard::new(
        store,
        config.risk,
        backend,
        config.map.container.as_str(),
        config.map.zoom,
    );
    dashboard.mount()?;
    let frame = if update.is_empty() {
        dashboard.frame()?
    } else {
        dashboard.apply(update).context("update rejected")?
    };

    for line in frame.status.lines() {
        println!("{line}");
    }
    println!("Markers: {}", frame.objects.len());
    Ok(())
}
