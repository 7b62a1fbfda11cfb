//! Installation-wide configuration stored in `{home}/config.yaml`.

// Standard library
use std::path::Path;
use std::time::Duration;

// External crates
use serde::{Deserialize, Serialize};

// Internal imports
use crate::error::Result;
use crate::user_paths;

/// Root structure for hark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarkConfig {
    /// Default log level when neither `--log-level` nor `HARK_LOG` is set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Polling behaviour while waiting for a machine to change state
    #[serde(default)]
    pub wait: WaitSettings,

    /// Host-only network used for private machine addresses
    #[serde(default)]
    pub network: NetworkSettings,

    /// Remote image store
    #[serde(default, skip_serializing_if = "ImageStoreSettings::is_default")]
    pub image_store: ImageStoreSettings,

    /// How long a workflow waits for another one to release the allocation lock
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Zero disables the deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(default = "default_subnet")]
    pub subnet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageStoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_subnet() -> String {
    "192.168.56.0/24".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WaitSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            subnet: default_subnet(),
        }
    }
}

impl ImageStoreSettings {
    pub fn is_default(&self) -> bool {
        self.url.is_none()
    }
}

impl Default for HarkConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            wait: WaitSettings::default(),
            network: NetworkSettings::default(),
            image_store: ImageStoreSettings::default(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl HarkConfig {
    /// Load the configuration for a hark home, writing the defaults on first use.
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = user_paths::config_path(home);

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to_path(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;
        std::fs::write(path, yaml)?;

        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}
