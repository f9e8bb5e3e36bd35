//! First-run setup.
//!
//! Writes the commented default configuration when no config file exists yet.

use std::fs;
use std::path::Path;

/// Embedded default configuration template.
pub const DEFAULT_CONFIG: &str = include_str!("../../environments/pcmviz.toml");

/// Writes the default config to `config_path` unless a file is already there.
///
/// Returns whether a file was written.
///
/// # Errors
/// - If the parent directory cannot be created
/// - If the file cannot be written
pub fn ensure_config(config_path: &Path) -> anyhow::Result<bool> {
    if config_path.exists() {
        tracing::debug!("Config present at {}", config_path.display());
        return Ok(false);
    }
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(config_path, DEFAULT_CONFIG)?;
    tracing::info!("Wrote default config to {}", config_path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VizConfig;

    #[test]
    fn default_template_parses_to_defaults() {
        let config = VizConfig::from_toml(DEFAULT_CONFIG).unwrap();
        let defaults = VizConfig::default();
        assert_eq!(config.audio.device, defaults.audio.device);
        assert_eq!(config.audio.sample_rate, defaults.audio.sample_rate);
        assert_eq!(config.audio.block_size, defaults.audio.block_size);
        assert_eq!(config.display.tick_ms, defaults.display.tick_ms);
        assert_eq!(config.display.critical_color, defaults.display.critical_color);
    }

    #[test]
    fn existing_config_is_left_alone() {
        let dir = std::env::temp_dir().join(format!("pcmviz-setup-{}", std::process::id()));
        let path = dir.join("pcmviz.toml");

        assert!(ensure_config(&path).unwrap());
        fs::write(&path, "[audio]\ndevice = \":3\"\n").unwrap();
        assert!(!ensure_config(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[audio]\ndevice = \":3\"\n");

        fs::remove_dir_all(&dir).unwrap();
    }
}
