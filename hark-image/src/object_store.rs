//! Image listings backed by an object-storage bucket.
//!
//! Objects live under `machine_images/built/{driver}/{guest}/{version}.{suffix}`.
//! Retrieval hands out a time-limited signed URL rather than a local path.

// Standard library
use std::time::Duration;

// External crates
use async_trait::async_trait;
use tracing::{debug, warn};

// Internal imports
use hark_core::error::{HarkError, Result};

use crate::image::{find_image, Image};

pub const KEY_PREFIX: &str = "machine_images/built";

/// How long a signed URL handed out by [`BucketImageSource::image_url`] stays valid.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// The subset of an object-storage client hark needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_keys(&self) -> Result<Vec<String>>;

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String>;
}

impl Image {
    /// The object key this image is stored under.
    pub fn object_key(&self) -> String {
        format!(
            "{}/{}/{}/{}.{}",
            KEY_PREFIX,
            self.driver,
            self.guest,
            self.version,
            self.suffix()
        )
    }

    /// Parse an object key. Keys must have exactly five segments and the
    /// last one must contain a dot.
    pub fn from_object_key(key: &str) -> Result<Self> {
        let invalid = || HarkError::InvalidImagePath(format!("unrecognised image key '{}'", key));

        let segments: Vec<&str> = key.split('/').collect();
        let [root, built, driver, guest, file] = segments.as_slice() else {
            return Err(invalid());
        };
        if format!("{}/{}", root, built) != KEY_PREFIX {
            return Err(invalid());
        }
        let (version, _suffix) = file.split_once('.').ok_or_else(invalid)?;

        Ok(Image {
            driver: driver.parse()?,
            guest: guest.parse()?,
            version: version.parse().map_err(|_| invalid())?,
        })
    }
}

pub struct BucketImageSource<S> {
    store: S,
}

impl<S: ObjectStore> BucketImageSource<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every image in the bucket, sorted by ascending version.
    pub async fn images(&self) -> Result<Vec<Image>> {
        let mut images: Vec<Image> = self
            .store
            .list_keys()
            .await?
            .iter()
            .filter_map(|key| match Image::from_object_key(key) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Skipping bucket object: {}", e);
                    None
                }
            })
            .collect();
        images.sort_by_key(|image| image.version);
        Ok(images)
    }

    pub async fn find_image(
        &self,
        driver: hark_store::DriverKind,
        guest: hark_store::Guest,
    ) -> Result<Image> {
        find_image(&self.images().await?, driver, guest)
    }

    /// A short-lived URL from which the image can be downloaded.
    pub async fn image_url(&self, image: &Image) -> Result<String> {
        let key = image.object_key();
        debug!("Signing URL for {}", key);
        self.store.signed_url(&key, SIGNED_URL_TTL).await
    }
}
