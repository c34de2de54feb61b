use lotto_core::DEFAULT_EXTRACTION_PERIOD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server settings. Loaded from an optional JSON file; command-line flags
/// override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub extraction_period_minutes: u64,
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("lotto-data"),
            extraction_period_minutes: DEFAULT_EXTRACTION_PERIOD.as_secs() / 60,
            verbose: false,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The extraction period as a duration. A zero period would make the
    /// scheduler's interval panic, so it is rejected here.
    pub fn extraction_period(&self) -> anyhow::Result<Duration> {
        anyhow::ensure!(
            self.extraction_period_minutes > 0,
            "extraction period must be at least 1 minute"
        );
        Ok(Duration::from_secs(self.extraction_period_minutes * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "extraction_period_minutes": 1 }"#).unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.extraction_period_minutes, 1);
        assert_eq!(config.data_dir, PathBuf::from("lotto-data"));
        assert!(!config.verbose);
    }

    #[test]
    fn default_period_is_five_minutes() {
        assert_eq!(ServerConfig::default().extraction_period_minutes, 5);
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut config = ServerConfig::default();
        config.extraction_period_minutes = 0;
        assert!(config.extraction_period().is_err());

        config.extraction_period_minutes = 2;
        assert_eq!(
            config.extraction_period().unwrap(),
            Duration::from_secs(120)
        );
    }
}
