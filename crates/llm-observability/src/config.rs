// llm-observability/crates/llm-observability/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8778;

/// Resolved once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

/// Values given explicitly on the command line. They beat the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::resolve(ConfigOverrides::default())
    }

    /// Explicit override > `OBSERVABILITY_*` environment > computed default.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: ConfigOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match overrides.db_path {
            Some(path) => path,
            None => match lookup("OBSERVABILITY_DB_PATH").filter(|v| !v.is_empty()) {
                Some(path) => PathBuf::from(path),
                None => Self::default_db_path(&lookup),
            },
        };

        let host = overrides
            .host
            .or_else(|| lookup("OBSERVABILITY_HOST").filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_HOST.into());

        let port = match overrides.port {
            Some(port) => port,
            None => match lookup("OBSERVABILITY_PORT").filter(|v| !v.is_empty()) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("OBSERVABILITY_PORT is not a valid port: {}", raw))?,
                None => DEFAULT_PORT,
            },
        };

        let debug = overrides.debug.unwrap_or_else(|| {
            lookup("OBSERVABILITY_DEBUG")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        });

        Ok(Self { db_path, host, port, debug })
    }

    /// Matches where the llm CLI keeps its logs: `$LLM_USER_PATH/logs.db`,
    /// otherwise `~/.config/io.datasette.llm/logs.db`.
    fn default_db_path<F>(lookup: &F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup("LLM_USER_PATH").filter(|v| !v.is_empty()) {
            Some(user_path) => PathBuf::from(user_path),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("io.datasette.llm"),
        };
        base.join("logs.db")
    }

    pub fn print_config(&self) {
        info!("Database: {}", self.db_path.display());
        info!("Server:   http://{}", self.bind_addr());
        if self.debug {
            info!("Debug logging enabled");
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
