use anyhow::Result;
use clap::Parser;
use list_hub::{
    api,
    config::{Cli, ServerConfig},
};
use list_hub_core::{storage::JsonFileStore, FolderService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::resolve(Cli::parse())?;
    let backend = JsonFileStore::open(config.data_file.clone())?;
    info!("Using data file {}", config.data_file.display());
    let store = Arc::new(Mutex::new(FolderService::new(backend)));

    let listener = TcpListener::bind(config.addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, api::app(store)).await?;
    Ok(())
}
