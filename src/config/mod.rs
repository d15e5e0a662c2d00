mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_secrets(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Parse configuration from TOML text without touching the filesystem
pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./cinefeed.toml",
        "~/.config/cinefeed/config.toml",
        "/etc/cinefeed/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Expand `$VAR` / `${VAR}` references in credential fields so secrets can
/// stay out of the config file.
fn expand_secrets(config: &mut Config) -> Result<()> {
    for secret in [
        &mut config.catalog.api_token,
        &mut config.forum.client_id,
        &mut config.forum.client_secret,
    ] {
        let expanded = shellexpand::env(secret.as_str())
            .with_context(|| "Failed to expand environment variable in config")?
            .into_owned();
        *secret = expanded;
    }
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if !config.catalog.movie_details_url.contains("{movie_id}") {
        anyhow::bail!("catalog.movie_details_url must contain the {{movie_id}} placeholder");
    }

    if config.catalog.api_token.is_empty() {
        tracing::warn!("catalog.api_token is empty; catalog requests will be rejected");
    }

    if config.forum.client_id.is_empty() || config.forum.client_secret.is_empty() {
        tracing::warn!("forum client credentials are empty; token exchange will fail");
    }

    if config.forum.max_attempts == 0 {
        anyhow::bail!("forum.max_attempts must be at least 1");
    }

    if config.forum.pool.max_connections == 0 {
        anyhow::bail!("forum.pool.max_connections must be at least 1");
    }

    if config.broker.catalog_topic.is_empty() || config.broker.posts_topic.is_empty() {
        anyhow::bail!("Broker topics cannot be empty");
    }

    if config.pipeline.max_in_flight_titles == 0 || config.pipeline.max_in_flight_posts == 0 {
        anyhow::bail!("Pipeline fan-out limits must be at least 1");
    }

    Ok(())
}
