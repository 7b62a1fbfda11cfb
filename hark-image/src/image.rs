// Standard library
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

// External crates
use regex::Regex;
use serde::{Deserialize, Serialize};

// Internal imports
use hark_core::error::{HarkError, Result};
use hark_store::{DriverKind, Guest};

const FILE_NAME_PATTERN: &str = r"^(\w+)_(.*)_v(\d+)\..*$";

static FILE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn file_name_re() -> &'static Regex {
    FILE_NAME_RE.get_or_init(|| Regex::new(FILE_NAME_PATTERN).expect("Invalid image file name pattern"))
}

/// A versioned base image for one driver and guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub driver: DriverKind,
    pub guest: Guest,
    pub version: u32,
}

impl Image {
    pub const FIELDS: [&'static str; 3] = ["driver", "guest", "version"];

    pub fn new(driver: DriverKind, guest: Guest, version: u32) -> Self {
        Self {
            driver,
            guest,
            version,
        }
    }

    /// Disk image format used by the driver.
    pub fn suffix(&self) -> &'static str {
        match self.driver {
            DriverKind::VirtualBox => "vmdk",
            DriverKind::Qemu => "qcow2",
        }
    }

    /// `{driver}_{guest}_v{version}.{suffix}`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_v{}.{}",
            self.driver,
            self.guest,
            self.version,
            self.suffix()
        )
    }

    /// Parse an image back out of a cache file name. Only the final path
    /// component is considered.
    pub fn from_file_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| HarkError::InvalidImagePath(path.display().to_string()))?;

        let caps = file_name_re().captures(name).ok_or_else(|| {
            HarkError::InvalidImagePath(format!(
                "\"{}\" does not match \"{}\"",
                name, FILE_NAME_PATTERN
            ))
        })?;

        let version = caps[3]
            .parse()
            .map_err(|_| HarkError::InvalidImagePath(format!("bad version in \"{}\"", name)))?;

        Ok(Self {
            driver: caps[1].parse()?,
            guest: caps[2].parse()?,
            version,
        })
    }

    pub fn value(&self, field: &str) -> String {
        match field {
            "driver" => self.driver.to_string(),
            "guest" => self.guest.to_string(),
            "version" => self.version.to_string(),
            _ => String::new(),
        }
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} v{}", self.driver, self.guest, self.version)
    }
}

/// The highest-version image for `driver` and `guest`.
pub fn find_image(images: &[Image], driver: DriverKind, guest: Guest) -> Result<Image> {
    images
        .iter()
        .filter(|image| image.driver == driver && image.guest == guest)
        .max_by_key(|image| image.version)
        .copied()
        .ok_or_else(|| {
            HarkError::ImageNotFound(format!(
                "no local image for driver '{}' and guest: '{}'",
                driver, guest
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let image = Image::new(DriverKind::VirtualBox, Guest::Debian8, 3);
        assert_eq!(image.file_name(), "virtualbox_Debian-8_v3.vmdk");
        assert_eq!(
            Image::new(DriverKind::Qemu, Guest::Debian8, 1).file_name(),
            "qemu_Debian-8_v1.qcow2"
        );
    }

    #[test]
    fn test_from_file_path() {
        let image =
            Image::from_file_path(Path::new("/home/u/.hark/images/virtualbox_Debian-8_v12.vmdk"))
                .unwrap();
        assert_eq!(image, Image::new(DriverKind::VirtualBox, Guest::Debian8, 12));
    }

    #[test]
    fn test_from_file_path_rejects_garbage() {
        for bad in ["notes.txt", "virtualbox_Debian-8.vmdk", "virtualbox_Debian-8_vX.vmdk"] {
            let err = Image::from_file_path(Path::new(bad)).unwrap_err();
            assert!(matches!(err, HarkError::InvalidImagePath(_)), "{}", bad);
        }
        let err = Image::from_file_path(Path::new("vmware_Debian-8_v1.vmdk")).unwrap_err();
        assert!(matches!(err, HarkError::UnknownDriver(_)));
    }

    #[test]
    fn test_find_image_picks_highest_version() {
        let images: Vec<Image> = [1, 3, 2]
            .into_iter()
            .map(|v| Image::new(DriverKind::VirtualBox, Guest::Debian8, v))
            .collect();

        let best = find_image(&images, DriverKind::VirtualBox, Guest::Debian8).unwrap();
        assert_eq!(best.version, 3);

        let err = find_image(&images, DriverKind::Qemu, Guest::Debian8).unwrap_err();
        assert!(matches!(err, HarkError::ImageNotFound(_)));
    }
}
