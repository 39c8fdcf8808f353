//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use nervos_shared::constants::{DEFAULT_CHUNK_CAPACITY, DEFAULT_HTTP_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`, or `PORT` to listen on all interfaces.
    /// Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// Root directory of the filesystem object store.
    /// Env: `STORAGE_PATH`
    /// Default: `./data`
    pub storage_path: PathBuf,

    /// Items per chunk before a new chunk is started.
    /// Env: `CHUNK_CAPACITY`
    /// Default: `500`
    pub chunk_capacity: usize,

    /// bcrypt cost for the stored passkey hash.
    /// Env: `BCRYPT_COST`
    /// Default: `11`
    pub bcrypt_cost: u32,

    /// Largest accepted sync request body in bytes.
    /// Env: `MAX_BODY_SIZE`
    /// Default: 16 MiB
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            storage_path: PathBuf::from("./data"),
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            bcrypt_cost: 11,
            max_body_size: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.http_addr = ([0, 0, 0, 0], port).into(),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, using default"),
            }
        }

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(path) = var("STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }

        if let Some(val) = var("CHUNK_CAPACITY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.chunk_capacity = n,
                _ => tracing::warn!(value = %val, "Invalid CHUNK_CAPACITY, using default"),
            }
        }

        if let Some(val) = var("BCRYPT_COST") {
            match val.parse::<u32>() {
                Ok(n) if (4..=31).contains(&n) => config.bcrypt_cost = n,
                _ => tracing::warn!(value = %val, "Invalid BCRYPT_COST, using default"),
            }
        }

        if let Some(val) = var("MAX_BODY_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_body_size = n;
            }
        }

        config
    }
}
