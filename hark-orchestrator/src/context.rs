//! Everything that lives in a hark home directory.

// Standard library
use std::fs;
use std::path::{Path, PathBuf};

// External crates
use tracing::{info, instrument};

// Internal imports
use hark_core::config::HarkConfig;
use hark_core::error::Result;
use hark_core::user_paths;
use hark_image::ImageCache;
use hark_network::Network;
use hark_store::Store;

/// An opened hark home: configuration, store and image cache.
#[derive(Debug, Clone)]
pub struct HarkContext {
    home: PathBuf,
    config: HarkConfig,
    store: Store,
    image_cache: ImageCache,
}

impl HarkContext {
    /// Open the home directory, creating it and its contents on first use.
    #[instrument(skip_all, fields(home = %home.display()))]
    pub async fn open(home: &Path) -> Result<Self> {
        if !home.exists() {
            info!("Creating hark base dir: {}", home.display());
            fs::create_dir_all(home)?;
        }

        let config = HarkConfig::load(home)?;
        let store = Store::open(&user_paths::db_path(home)).await?;
        let image_cache = ImageCache::new(user_paths::images_dir(home))?;

        Ok(Self {
            home: home.to_path_buf(),
            config,
            store,
            image_cache,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &HarkConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn image_cache(&self) -> &ImageCache {
        &self.image_cache
    }

    pub fn log_file(&self) -> PathBuf {
        user_paths::log_file(&self.home)
    }

    pub fn lock_path(&self) -> PathBuf {
        user_paths::lock_path(&self.home)
    }

    /// The configured host-only network.
    pub fn network(&self) -> Result<Network> {
        self.config.network.subnet.parse()
    }
}
