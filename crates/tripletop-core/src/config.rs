use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::enrich::{DEFAULT_MARKET_SUFFIX, DEFAULT_MAX_CONCURRENCY, MAX_CONCURRENCY_LIMIT};
use crate::select::{SelectionCriteria, DEFAULT_TOP_N};
use crate::sink::DEFAULT_TITLE_PREFIX;
use crate::source::{SourceUrls, DEFAULT_FETCH_TIMEOUT_MS};
use crate::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "tripletop.toml";
pub const SHARE_WITH_ENV: &str = "TARGET_EMAIL";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Run settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Country filter; empty disables filtering.
    pub country: String,
    pub top_n: usize,
    pub market_suffix: String,
    pub throttle_ms: u64,
    pub lookup_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    pub max_concurrency: usize,
    pub output_dir: PathBuf,
    pub sources: SourceUrls,
    pub sheets: SheetsConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub share_with: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub title_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            country: String::from("India"),
            top_n: DEFAULT_TOP_N,
            market_suffix: String::from(DEFAULT_MARKET_SUFFIX),
            throttle_ms: 1_000,
            lookup_timeout_ms: 10_000,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            output_dir: PathBuf::from("outputs"),
            sources: SourceUrls::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            share_with: None,
            access_token: None,
            title_prefix: String::from(DEFAULT_TITLE_PREFIX),
        }
    }
}

impl std::fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("share_with", &self.share_with)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("title_prefix", &self.title_prefix)
            .finish()
    }
}

impl PipelineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when given, else `tripletop.toml` when present, else defaults.
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overrides sheet settings from `TARGET_EMAIL` and `GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(email) = non_empty(SHARE_WITH_ENV) {
            self.sheets.share_with = Some(email.trim().to_owned());
        }
        if let Some(token) = non_empty(ACCESS_TOKEN_ENV) {
            self.sheets.access_token = Some(token.trim().to_owned());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid(String::from(
                "top_n must be greater than zero",
            )));
        }
        if self.market_suffix.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "market_suffix cannot be empty",
            )));
        }
        if self.lookup_timeout_ms == 0 || self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "timeouts must be greater than zero",
            )));
        }
        for url in [
            &self.sources.marketcap,
            &self.sources.revenue,
            &self.sources.earnings,
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!(
                    "source url '{url}' must be http(s)"
                )));
            }
        }
        Ok(())
    }

    /// Worker count clamped to the supported range.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_CONCURRENCY_LIMIT)
    }

    pub fn selection_criteria(&self) -> SelectionCriteria {
        let country = Some(self.country.clone());
        SelectionCriteria::new(country, self.top_n)
    }
}
