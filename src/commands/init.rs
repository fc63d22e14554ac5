//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# Blog configuration

# Site
title: spacetraveling
language: pt-BR
timezone: America/Sao_Paulo

# URL
root: /

# Directory
public_dir: public

# Reading time
words_per_minute: 200

# Content repository (PRISMIC_API_ENDPOINT / PRISMIC_ACCESS_TOKEN override these)
prismic:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  page_size: 1
  timeout_secs: 30

# UI strings
labels:
  load_more: Carregar mais posts
  loading: Carregando...
  not_found: Post não encontrado
  reading_time_suffix: min
"#;

/// Initialize a new blog in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    fs::write(&config_path, CONFIG_TEMPLATE)?;
    tracing::debug!("Wrote {:?}", config_path);

    Ok(())
}
