//! cms-blog: a static blog front-end for a headless CMS
//!
//! Posts are authored in a Prismic repository. At build time the first
//! listing page and every post are fetched and rendered to HTML with
//! embedded Tera templates; a small server serves the result, appends
//! further listing pages and renders posts published after the build.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod post_page;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;

pub use error::BlogError;

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.apply_env(|key| std::env::var(key).ok());
            config.validate()?;
            config
        };

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// Client for the configured content repository
    pub fn content_source(&self) -> error::Result<content::PrismicClient> {
        content::PrismicClient::new(&self.config.prismic)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
