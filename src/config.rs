//! Runtime configuration read from the environment.
//!
//! * `TINYORM_URL`: connection string of the backing store, `memory://` by
//!   default. See [`StoreUrl`].
//! * `DEBUG`: `1`, `true` or `yes` (any case) lowers the log level to DEBUG.

use std::{fmt::Display, path::PathBuf};

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::error::{Error, Result};

pub const URL_VAR: &str = "TINYORM_URL";
pub const DEBUG_VAR: &str = "DEBUG";

/// Where a [`crate::Database`] keeps its data
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUrl {
    Memory,
    File(PathBuf),
}

impl StoreUrl {
    /// Parses `memory://`, `memory:`, `:memory:`, `file://<path>` or
    /// `file:<path>`. An empty string means memory.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        match url {
            "" | "memory://" | "memory:" | ":memory:" => return Ok(StoreUrl::Memory),
            _ => {}
        }
        let path = url
            .strip_prefix("file://")
            .or_else(|| url.strip_prefix("file:"))
            .ok_or(Error::Config(format!("unsupported connection string {}", url)))?;
        if path.is_empty() {
            return Err(Error::Config(format!("missing path in {}", url)));
        }
        Ok(StoreUrl::File(PathBuf::from(path)))
    }
}

impl Display for StoreUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreUrl::Memory => f.write_str("memory://"),
            StoreUrl::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: StoreUrl,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: StoreUrl::Memory,
            debug: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds a config from a variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = match lookup(URL_VAR) {
            Some(url) => StoreUrl::parse(&url)?,
            None => StoreUrl::Memory,
        };
        let debug = lookup(DEBUG_VAR)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(Self { url, debug })
    }

    pub fn log_level(&self) -> Level {
        if self.debug { Level::DEBUG } else { Level::INFO }
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` directives still apply
/// on top of the configured default level.
pub fn init_tracing(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.log_level().into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::PathBuf};

    use tracing::Level;

    use super::{Config, StoreUrl};
    use crate::error::{Error, Result};

    #[test]
    fn test_parse_store_url() -> Result<()> {
        for url in ["", "memory://", "memory:", ":memory:"] {
            assert_eq!(StoreUrl::parse(url)?, StoreUrl::Memory);
        }
        assert_eq!(
            StoreUrl::parse("file:///tmp/tiny.db")?,
            StoreUrl::File(PathBuf::from("/tmp/tiny.db"))
        );
        assert_eq!(
            StoreUrl::parse("file:data/tiny.db")?,
            StoreUrl::File(PathBuf::from("data/tiny.db"))
        );
        assert!(matches!(StoreUrl::parse("sqlite:///:memory:"), Err(Error::Config(_))));
        assert!(matches!(StoreUrl::parse("file://"), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn test_config_from_vars() -> Result<()> {
        let vars = HashMap::from([("DEBUG", "Yes"), ("TINYORM_URL", "file:tiny.db")]);
        let config = Config::from_vars(|name| vars.get(name).map(|v| v.to_string()))?;
        assert!(config.debug);
        assert_eq!(config.log_level(), Level::DEBUG);
        assert_eq!(config.url, StoreUrl::File(PathBuf::from("tiny.db")));

        let config = Config::from_vars(|_| None)?;
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level(), Level::INFO);

        let config = Config::from_vars(|name| (name == "DEBUG").then(|| "0".to_string()))?;
        assert!(!config.debug);
        Ok(())
    }
}
