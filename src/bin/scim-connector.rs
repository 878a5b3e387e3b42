//! SCIM connector server.
//!
//! Serves users and groups from in-memory stores, optionally seeded from a JSON
//! file, with the file-backed import cache in front of list exports.
//!
//! ```bash
//! RUST_LOG=debug scim-connector --config connector.toml --port 5000
//! ```

use clap::Parser;
use log::{error, info};
use scim_connector::{ConnectorConfig, InMemoryStore, ScimEndpoints, SeedData, server};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "scim-connector", version, about = "SCIM 2.0 provisioning connector")]
struct CliArgs {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = "SCIM_CONNECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overriding `server.bind`
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on, overriding `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(CliArgs::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ConnectorConfig::from_file(path)?,
        None => ConnectorConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let seed = match &config.seed_file {
        Some(path) => {
            let seed = SeedData::load(path)?;
            info!(
                "Seeded {} users and {} groups from {}",
                seed.users.len(),
                seed.groups.len(),
                path.display()
            );
            seed
        }
        None => SeedData::default(),
    };

    let addr = config.server.socket_addr()?;
    let users = Arc::new(InMemoryStore::from_records(seed.users));
    let groups = Arc::new(InMemoryStore::from_records(seed.groups));
    let endpoints = ScimEndpoints::open(Arc::new(config), users, groups).await?;

    server::serve(Arc::new(endpoints), addr).await?;
    Ok(())
}
