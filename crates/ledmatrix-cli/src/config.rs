//! Configuration management.

use anyhow::{Context, Result};
use ledmatrix_hw::Geometry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Device path as reported by the HID driver
    #[serde(default)]
    pub device: Option<String>,

    /// Matrix geometry as ROWSxCOLS or ROWSxCOLSxBPP
    #[serde(default = "default_geometry")]
    pub geometry: String,

    /// Record packets in memory instead of writing to hardware
    #[serde(default)]
    pub dry_run: bool,
}

fn default_geometry() -> String {
    Geometry::default().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            geometry: default_geometry(),
            dry_run: false,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Parsed geometry.
    pub fn geometry(&self) -> Result<Geometry> {
        self.geometry
            .parse()
            .with_context(|| format!("Invalid geometry in configuration: {}", self.geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.geometry().unwrap().frame_size(), 64);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_parse() {
        let config = Config::parse(
            r#"
            device = "/dev/hidraw3"
            geometry = "9x34x3"
            dry_run = true
            "#,
        )
        .unwrap();
        assert_eq!(config.device.as_deref(), Some("/dev/hidraw3"));
        assert_eq!(config.geometry().unwrap().frame_size(), 918);
        assert!(config.dry_run);
    }

    #[test]
    fn test_invalid_geometry() {
        let config = Config::parse(r#"geometry = "wide""#).unwrap();
        assert!(config.geometry().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("ledmatrix-config-{}.toml", std::process::id()));
        let config = Config {
            device: Some("DEV0".to_string()),
            geometry: "4x4x2".to_string(),
            dry_run: true,
        };
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
