use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        let base_url = Url::parse(&self.source.base_url)
            .with_context(|| format!("source.base_url is not a valid url: {}", self.source.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("source.base_url cannot carry a path: {}", self.source.base_url);
        }

        if self.listing.page == 0 {
            bail!("listing.page must be at least 1");
        }
        if self.listing.order_by.trim().is_empty() {
            bail!("listing.order_by must not be empty");
        }
        if !matches!(
            self.listing.order_direction.as_str(),
            "ascending" | "descending"
        ) {
            bail!(
                "listing.order_direction must be ascending or descending, got {}",
                self.listing.order_direction
            );
        }
        if self.enrich.workers == 0 {
            bail!("enrich.workers must be at least 1");
        }
        if self.fetch.timeout_secs == 0 || self.fetch.detail_timeout_secs == 0 {
            bail!("fetch timeouts must be positive");
        }

        if self.fetch.mode == FetchMode::File && self.fetch.listing_file.is_none() {
            bail!("fetch.listing_file is required for file mode");
        }

        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        resolve_path(self.origin.as_deref(), path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Http,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_dir: Option<PathBuf>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_detail_timeout_secs")]
    pub detail_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            listing_file: None,
            detail_dir: None,
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
            detail_timeout_secs: default_detail_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default = "default_order_direction")]
    pub order_direction: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            order_by: default_order_by(),
            order_direction: default_order_direction(),
            page: default_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        let config = AppConfig::default();
        config.validate()?;
        return Ok(config);
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let mut config: AppConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", path.display()))?;
    config.origin = Some(path.to_path_buf());
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub fn resolve_path(base_config_path: Option<&Path>, maybe_relative: &Path) -> Result<PathBuf> {
    if maybe_relative.is_absolute() {
        return Ok(maybe_relative.to_path_buf());
    }

    let Some(base_config_path) = base_config_path else {
        return Ok(maybe_relative.to_path_buf());
    };

    let parent = base_config_path.parent().ok_or_else(|| {
        anyhow!(
            "config has no parent directory: {}",
            base_config_path.display()
        )
    })?;

    Ok(parent.join(maybe_relative))
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://mobile311.sfgov.org".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_detail_timeout_secs() -> u64 {
    15
}

fn default_order_by() -> String {
    "chronological".to_string()
}

fn default_order_direction() -> String {
    "descending".to_string()
}

fn default_page() -> u32 {
    22
}

fn default_workers() -> usize {
    1
}
