mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./episodex.toml",
        "~/.config/episodex/config.toml",
        "/etc/episodex/config.toml",
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

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    for (name, budget) in [
        ("limiter.catalog", &config.limiter.catalog),
        ("limiter.analysis", &config.limiter.analysis),
    ] {
        if budget.permits == 0 {
            anyhow::bail!("{name}.permits must be greater than 0");
        }
        if budget.window_secs == 0 {
            anyhow::bail!("{name}.window_secs must be greater than 0");
        }
    }

    if config.scan.group_concurrency == 0 {
        anyhow::bail!("scan.group_concurrency must be greater than 0");
    }

    if config.catalog.request_timeout_secs == 0 {
        anyhow::bail!("catalog.request_timeout_secs must be greater than 0");
    }

    match config.scan.username.as_deref() {
        Some(name) if !name.trim().is_empty() => {}
        _ if config.scan.enhanced => {
            tracing::warn!("No scan.username set; candidates will come from title searches only");
        }
        _ => {
            tracing::warn!(
                "No scan.username set and enhanced mode is off; scans will find no candidates"
            );
        }
    }

    Ok(())
}
