//! Configuration types for trial import and table export.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::tables::ChannelKind;

/// Errors that can occur while loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for reading per-sensor export files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Suffix appended to `folder + trial + fileId` to form the export path
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// Field delimiter for header and data rows
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Prefix marking metadata lines above the header
    #[serde(default = "default_comment_prefix")]
    pub comment_prefix: String,
}

fn default_file_suffix() -> String {
    ".txt".to_string()
}

fn default_delimiter() -> char {
    '\t'
}

fn default_comment_prefix() -> String {
    "//".to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            file_suffix: default_file_suffix(),
            delimiter: default_delimiter(),
            comment_prefix: default_comment_prefix(),
        }
    }
}

/// Configuration for writing assembled channel tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory; the trial folder is used when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_acceleration_suffix")]
    pub acceleration_suffix: String,

    #[serde(default = "default_angular_velocity_suffix")]
    pub angular_velocity_suffix: String,

    #[serde(default = "default_magnetic_suffix")]
    pub magnetic_heading_suffix: String,

    #[serde(default = "default_orientation_suffix")]
    pub orientation_suffix: String,

    /// File extension without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_acceleration_suffix() -> String {
    "accelerations".to_string()
}

fn default_angular_velocity_suffix() -> String {
    "gyros".to_string()
}

fn default_magnetic_suffix() -> String {
    "magnetometers".to_string()
}

fn default_orientation_suffix() -> String {
    "quaternions".to_string()
}

fn default_extension() -> String {
    "sto".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            acceleration_suffix: default_acceleration_suffix(),
            angular_velocity_suffix: default_angular_velocity_suffix(),
            magnetic_heading_suffix: default_magnetic_suffix(),
            orientation_suffix: default_orientation_suffix(),
            extension: default_extension(),
        }
    }
}

impl OutputConfig {
    /// File name suffix used for a channel kind's table.
    pub fn suffix_for(&self, kind: ChannelKind) -> &str {
        match kind {
            ChannelKind::LinearAcceleration => &self.acceleration_suffix,
            ChannelKind::AngularVelocity => &self.angular_velocity_suffix,
            ChannelKind::MagneticHeading => &self.magnetic_heading_suffix,
            ChannelKind::Orientation => &self.orientation_suffix,
        }
    }

    /// Full file name for a trial's table, e.g. `MT_012005D6_031-accelerations.sto`.
    pub fn file_name(&self, trial: &str, kind: ChannelKind) -> String {
        format!("{}{}.{}", trial, self.suffix_for(kind), self.extension)
    }
}

/// Top-level configuration combining reader and output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl ImportConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: ImportConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_reader_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.file_suffix, ".txt");
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.comment_prefix, "//");
    }

    #[test]
    fn test_output_file_name() {
        let config = OutputConfig::default();
        assert_eq!(
            config.file_name("MT_012005D6_031-", ChannelKind::LinearAcceleration),
            "MT_012005D6_031-accelerations.sto"
        );
        assert_eq!(
            config.file_name("t-", ChannelKind::Orientation),
            "t-quaternions.sto"
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ImportConfig = serde_yaml::from_str("reader:\n  file_suffix: .tsv\n").unwrap();
        assert_eq!(config.reader.file_suffix, ".tsv");
        assert_eq!(config.reader.delimiter, '\t');
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("import.yaml");

        let mut config = ImportConfig::default();
        config.output.extension = "tsv".to_string();
        config.to_yaml(&path).unwrap();

        let loaded = ImportConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
