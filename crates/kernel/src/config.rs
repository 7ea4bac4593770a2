//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Process configuration.
///
/// Site behaviour (caching, site name) lives in the YAML settings file at
/// [`Config::config_file`]; this only covers what the process needs to boot.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Redis connection URL. Without it the page cache stays in-process
    /// and sessions are kept in memory.
    pub redis_url: Option<String>,

    /// Theme template directory (default: ./theme).
    pub theme_dir: PathBuf,

    /// Site settings file (default: ./app/config/config.yml).
    pub config_file: PathBuf,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());

        let theme_dir = env::var("THEME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./theme"));

        let config_file = env::var("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./app/config/config.yml"));

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        Ok(Self {
            port,
            redis_url,
            theme_dir,
            config_file,
            cookie_same_site,
        })
    }
}
