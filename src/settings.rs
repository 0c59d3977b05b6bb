use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_SITEMAP_URL: &str = "https://assets.djicdn.com/sitemap/store/store-nl.xml";

/// Runtime settings; every key can be overridden with `SCRAPER_<KEY>`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub error_log: PathBuf,
    pub sitemap_url: String,
    /// Pause after each page load before the first rule runs.
    pub settle_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_builder(Config::builder().add_source(Environment::with_prefix("SCRAPER").try_parsing(true)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        builder
            .set_default("db_path", "data/products.sqlite")?
            .set_default("error_log", "errors.txt")?
            .set_default("sitemap_url", DEFAULT_SITEMAP_URL)?
            .set_default("settle_ms", 1000_i64)?
            .set_default("timeout_secs", 30_i64)?
            .set_default(
                "user_agent",
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            )?
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
