//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::BlogError;
use crate::helpers::Locale;

/// Environment variable overriding `prismic.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub root: String,

    // Directory
    pub public_dir: String,

    // Reading time
    pub words_per_minute: usize,

    // Content source
    #[serde(default)]
    pub prismic: PrismicConfig,

    // UI strings
    #[serde(default)]
    pub labels: LabelsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            root: "/".to_string(),

            public_dir: "public".to_string(),

            words_per_minute: 200,

            prismic: PrismicConfig::default(),
            labels: LabelsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override content source settings from environment lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!("Using content endpoint from {}", ENDPOINT_ENV);
            self.prismic.endpoint = endpoint;
        }
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.prismic.access_token = Some(token);
        }
    }

    /// Check values that would otherwise fail deep inside rendering
    pub fn validate(&self) -> std::result::Result<(), BlogError> {
        if self.words_per_minute == 0 {
            return Err(BlogError::config("words_per_minute must be positive"));
        }
        if self.prismic.page_size == 0 {
            return Err(BlogError::config("prismic.page_size must be positive"));
        }
        self.tz()?;
        self.locale()?;
        Ok(())
    }

    /// The configured display timezone
    pub fn tz(&self) -> std::result::Result<chrono_tz::Tz, BlogError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| BlogError::config(format!("invalid timezone '{}': {}", self.timezone, e)))
    }

    /// The configured display locale
    pub fn locale(&self) -> std::result::Result<Locale, BlogError> {
        Locale::from_tag(&self.language)
            .ok_or_else(|| BlogError::config(format!("unsupported language '{}'", self.language)))
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API v2 root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Page size of the build-time listing fetch
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            timeout_secs: 30,
        }
    }
}

/// User-facing strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub load_more: String,
    pub loading: String,
    pub not_found: String,
    pub missing_date: String,
    pub reading_time_suffix: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            load_more: "Carregar mais posts".to_string(),
            loading: "Carregando...".to_string(),
            not_found: "Post n\u{e3}o encontrado".to_string(),
            missing_date: "\u{2014}".to_string(),
            reading_time_suffix: "min".to_string(),
        }
    }
}
