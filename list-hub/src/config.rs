use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_DATA_FILE: &str = "data/folders.json";

#[derive(Parser, Debug, Default)]
#[command(name = "list-hub")]
#[command(about = "Shopping list folders over HTTP")]
pub struct Cli {
    /// Listen address
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Path of the JSON data file
    #[arg(short, long)]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub data_file: PathBuf,
}

impl ServerConfig {
    /// Flags win over `LIST_HUB_ADDR` / `LIST_HUB_DATA_FILE`, which win over
    /// the defaults.
    pub fn resolve(cli: Cli) -> Result<Self> {
        Self::from_vars(cli, |key| std::env::var(key).ok())
    }

    pub fn from_vars(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr = cli
            .addr
            .or_else(|| lookup("LIST_HUB_ADDR"))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", addr))?;
        let data_file = cli
            .data_file
            .or_else(|| lookup("LIST_HUB_DATA_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));
        Ok(Self { addr, data_file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::from_vars(Cli::default(), |_| None).unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(cfg.data_file, PathBuf::from("data/folders.json"));
    }

    #[test]
    fn env_then_flags() {
        let env = |key: &str| match key {
            "LIST_HUB_ADDR" => Some("0.0.0.0:9000".to_string()),
            "LIST_HUB_DATA_FILE" => Some("/tmp/lists.json".to_string()),
            _ => None,
        };
        let cfg = ServerConfig::from_vars(Cli::default(), env).unwrap();
        assert_eq!(cfg.addr.port(), 9000);
        assert_eq!(cfg.data_file, PathBuf::from("/tmp/lists.json"));

        let cli = Cli::parse_from(["list-hub", "--addr", "127.0.0.1:7000"]);
        let cfg = ServerConfig::from_vars(cli, env).unwrap();
        assert_eq!(cfg.addr.port(), 7000);
        assert_eq!(cfg.data_file, PathBuf::from("/tmp/lists.json"));
    }

    #[test]
    fn bad_address_is_rejected() {
        let cli = Cli {
            addr: Some("not an address".to_string()),
            data_file: None,
        };
        assert!(ServerConfig::from_vars(cli, |_| None).is_err());
    }
}
