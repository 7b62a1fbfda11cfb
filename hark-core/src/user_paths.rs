//! Locations of hark's on-disk state.
//!
//! Everything lives under a single home directory, `~/.hark` unless
//! overridden by `--hark-home` or the `HARKHOME` environment variable.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{HarkError, Result};

pub const HOME_ENV: &str = "HARKHOME";

/// Resolve the hark home directory.
pub fn hark_home(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(".hark"))
        .ok_or_else(|| HarkError::Config("could not determine the user's home directory".into()))
}

pub fn db_path(home: &Path) -> PathBuf {
    home.join("hark.db")
}

pub fn images_dir(home: &Path) -> PathBuf {
    home.join("images")
}

pub fn log_file(home: &Path) -> PathBuf {
    home.join("hark.log")
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.yaml")
}

/// Advisory lock taken by workflows that allocate ports and addresses.
pub fn lock_path(home: &Path) -> PathBuf {
    home.join("hark.lock")
}
