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
        "./config.toml",
        "./clipforged.toml",
        "~/.config/clipforged/config.toml",
        "/etc/clipforged/config.toml",
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
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.engine.timeout_secs == 0 {
        anyhow::bail!("Engine timeout cannot be 0");
    }

    if !config.engine.fontfile.is_absolute() {
        anyhow::bail!(
            "Engine fontfile must be an absolute path: {:?}",
            config.engine.fontfile
        );
    }

    if config.storage.log_dir == config.storage.output_dir {
        anyhow::bail!(
            "Log directory must differ from the output directory: {:?}",
            config.storage.log_dir
        );
    }

    if let Some(ref ffmpeg) = config.engine.ffmpeg_path {
        if !ffmpeg.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", ffmpeg);
        }
    }

    if !config.engine.fontfile.exists() {
        tracing::warn!(
            "Font file does not exist, caption recipes will fail: {:?}",
            config.engine.fontfile
        );
    }

    Ok(())
}
