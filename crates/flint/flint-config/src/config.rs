use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct BusConfig {
    #[serde(default = "defaults::segment_path")]
    pub segment_path: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::notify_slots")]
    pub notify_slots: Vec<u64>,
    #[serde(default = "defaults::notify_interval_us")]
    pub notify_interval_us: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn segment_path() -> String {
        "/tmp/flint_event_bus".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn notify_slots() -> Vec<u64> {
        vec![0, 1]
    }

    pub fn notify_interval_us() -> u64 {
        100_000
    }
}

impl BusConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: BusConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            segment_path: defaults::segment_path(),
            log_level: defaults::log_level(),
            notify_slots: defaults::notify_slots(),
            notify_interval_us: defaults::notify_interval_us(),
        }
    }
}
