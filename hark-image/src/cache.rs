//! A local directory of image files.

// Standard library
use std::fs;
use std::path::{Path, PathBuf};

// External crates
use tracing::{info, warn};

// Internal imports
use hark_core::error::Result;

use crate::image::Image;

#[derive(Debug, Clone)]
pub struct ImageCache {
    path: PathBuf,
}

impl ImageCache {
    /// Open the cache at `path`, creating the directory if needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            info!("Creating hark image dir: {}", path.display());
            fs::create_dir_all(&path)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached images, sorted by ascending version. Files whose names
    /// do not parse as an image are skipped.
    pub fn images(&self) -> Result<Vec<Image>> {
        let mut images = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match Image::from_file_path(&entry.path()) {
                Ok(image) => images.push(image),
                Err(e) => warn!("Skipping unrecognised file in image cache: {}", e),
            }
        }
        images.sort_by_key(|image| image.version);
        Ok(images)
    }

    pub fn full_image_path(&self, image: &Image) -> PathBuf {
        self.path.join(image.file_name())
    }

    /// Copy a local file into the cache as `image`, replacing any existing copy.
    pub fn save_from_file(&self, image: &Image, source: &Path) -> Result<PathBuf> {
        let dest = self.full_image_path(image);
        info!(
            "Copying local file {} to destination image {}",
            source.display(),
            dest.display()
        );
        fs::copy(source, &dest)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_store::{DriverKind, Guest};
    use tempfile::tempdir;

    #[test]
    fn test_new_creates_directory() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("images");
        let cache = ImageCache::new(&path).expect("Failed to create cache");
        assert!(path.is_dir());
        assert!(cache.images().unwrap().is_empty());
    }

    #[test]
    fn test_images_sorted_and_garbage_skipped() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cache = ImageCache::new(dir.path()).expect("Failed to create cache");
        for name in [
            "virtualbox_Debian-8_v3.vmdk",
            "virtualbox_Debian-8_v1.vmdk",
            "README.md",
            "virtualbox_Debian-8_v2.vmdk",
        ] {
            fs::write(dir.path().join(name), b"disk").unwrap();
        }
        fs::create_dir(dir.path().join("virtualbox_Debian-8_v9.vmdk.d")).unwrap();

        let versions: Vec<u32> = cache.images().unwrap().iter().map(|i| i.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_save_from_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cache = ImageCache::new(dir.path().join("images")).expect("Failed to create cache");
        let source = dir.path().join("downloaded.vmdk");
        fs::write(&source, b"disk bytes").unwrap();

        let image = Image::new(DriverKind::VirtualBox, Guest::Debian8, 4);
        let dest = cache.save_from_file(&image, &source).unwrap();

        assert_eq!(dest, cache.full_image_path(&image));
        assert_eq!(fs::read(&dest).unwrap(), b"disk bytes");
        assert_eq!(cache.images().unwrap(), vec![image]);
    }
}
