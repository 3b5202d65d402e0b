use crate::{clock::Latency, error::FileDeskError};
use clap::Parser;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

/// Largest accepted `latency_scale`. Mutations then take 30 seconds.
pub const MAX_LATENCY_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Parser)]
pub struct StartArgs {
    #[arg(short, long, default_value = "config.json")]
    pub config_path: String,

    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    #[arg(short, long, default_value = "3030")]
    pub port: u16,

    #[arg(short, long, default_value = "INFO")]
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Directory containing `files.json` and `folders.json`.
    /// The bundled seed is used when not set.
    pub seed_dir: Option<String>,

    #[serde(default)]
    pub latency: LatencyMode,

    /// Multiplier applied to the simulated delays
    pub latency_scale: Option<f64>,

    #[serde(default)]
    pub folder_delete: FolderDeletePolicy,
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, FileDeskError> {
        if !path.as_ref().exists() {
            info!(
                "No config at {}, using defaults",
                path.as_ref().display()
            );
            return Ok(Self::default());
        }
        let config = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FileDeskError> {
        if let Some(scale) = self.latency_scale {
            if !scale.is_finite() || !(0.0..=MAX_LATENCY_SCALE).contains(&scale) {
                return Err(FileDeskError::Validation(format!(
                    "latency_scale must be between 0 and {MAX_LATENCY_SCALE}, got {scale}"
                )));
            }
        }
        Ok(())
    }

    pub fn latency(&self) -> Latency {
        match self.latency {
            LatencyMode::None => Latency::none(),
            LatencyMode::Simulated => Latency::Simulated {
                scale: self.latency_scale.unwrap_or(1.0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    None,
    #[default]
    Simulated,
}

/// What happens to the contents of a folder that gets deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderDeletePolicy {
    /// Remove the folder only, children keep their dangling parent id
    Orphan,

    /// Move child folders and contained files to the root
    Reparent,

    /// Refuse to delete folders that still contain anything
    #[default]
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(None, config.seed_dir);
        assert_eq!(FolderDeletePolicy::Reject, config.folder_delete);
        assert_eq!(Latency::simulated(), config.latency());
    }

    #[test]
    fn parses_all_fields() {
        let config: Config = serde_json::from_str(
            r#"{
                "seed_dir": "seed",
                "latency": "simulated",
                "latency_scale": 0.25,
                "folder_delete": "reparent"
            }"#,
        )
        .unwrap();

        assert_eq!(Some("seed".to_string()), config.seed_dir);
        assert_eq!(FolderDeletePolicy::Reparent, config.folder_delete);
        assert_eq!(Latency::Simulated { scale: 0.25 }, config.latency());

        let config: Config = serde_json::from_str(r#"{"latency": "none"}"#).unwrap();
        assert_eq!(Latency::None, config.latency());
    }

    #[test]
    fn rejects_unusable_latency_scales() {
        for scale in ["1e30", "-1", "100.5"] {
            let config: Config =
                serde_json::from_str(&format!(r#"{{"latency_scale": {scale}}}"#)).unwrap();
            assert!(
                matches!(config.validate(), Err(FileDeskError::Validation(_))),
                "{scale}"
            );
        }

        for scale in ["0", "0.5", "100"] {
            let config: Config =
                serde_json::from_str(&format!(r#"{{"latency_scale": {scale}}}"#)).unwrap();
            assert!(config.validate().is_ok(), "{scale}");
        }
    }

    #[test]
    fn read_validates_the_file() {
        let path = std::env::temp_dir().join(format!("filedesk-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"latency_scale": 1e30}"#).unwrap();
        let result = Config::read(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(FileDeskError::Validation(_))));
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::read("definitely/not/here/config.json").unwrap();
        assert_eq!(FolderDeletePolicy::Reject, config.folder_delete);
    }
}
