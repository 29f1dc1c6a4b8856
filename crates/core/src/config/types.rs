use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::similarity::RecomputeMode;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bookshelf.db")
}

/// Similarity maintenance configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimilarityConfig {
    /// How `POST /similarity/recompute` treats existing edges (default: rebuild)
    #[serde(default)]
    pub recompute_mode: RecomputeMode,
    /// Sync similarity edges in the same transaction as every book save
    /// (default: true)
    #[serde(default = "default_sync_on_save")]
    pub sync_on_save: bool,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            recompute_mode: RecomputeMode::default(),
            sync_on_save: default_sync_on_save(),
        }
    }
}

fn default_sync_on_save() -> bool {
    true
}
