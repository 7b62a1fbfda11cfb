// Standard library
use std::fmt;
use std::str::FromStr;

// External crates
use serde::{Deserialize, Serialize};

// Internal imports
use hark_core::error::HarkError;

/// Which hypervisor backend a machine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[serde(rename = "virtualbox")]
    VirtualBox,
    Qemu,
}

impl DriverKind {
    pub const ALL: [DriverKind; 2] = [DriverKind::VirtualBox, DriverKind::Qemu];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::VirtualBox => "virtualbox",
            DriverKind::Qemu => "qemu",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = HarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DriverKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| HarkError::UnknownDriver(s.to_string()))
    }
}

/// Guest operating system profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guest {
    #[serde(rename = "Debian-8")]
    Debian8,
}

impl Guest {
    pub const ALL: [Guest; 1] = [Guest::Debian8];

    pub fn as_str(&self) -> &'static str {
        match self {
            Guest::Debian8 => "Debian-8",
        }
    }
}

impl fmt::Display for Guest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Guest {
    type Err = HarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guest::ALL
            .into_iter()
            .find(|guest| guest.as_str() == s)
            .ok_or_else(|| HarkError::UnknownGuest(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_kind_parse() {
        assert_eq!("virtualbox".parse::<DriverKind>().unwrap(), DriverKind::VirtualBox);
        assert_eq!("qemu".parse::<DriverKind>().unwrap(), DriverKind::Qemu);
        let err = "bla blah".parse::<DriverKind>().unwrap_err();
        assert!(matches!(err, HarkError::UnknownDriver(ref d) if d == "bla blah"));
    }

    #[test]
    fn test_guest_parse() {
        assert_eq!("Debian-8".parse::<Guest>().unwrap(), Guest::Debian8);
        assert!(matches!(
            "Plan9".parse::<Guest>().unwrap_err(),
            HarkError::UnknownGuest(_)
        ));
    }

    #[test]
    fn test_serde_names_match_display() {
        assert_eq!(
            serde_json::to_string(&DriverKind::VirtualBox).unwrap(),
            "\"virtualbox\""
        );
        assert_eq!(serde_json::to_string(&Guest::Debian8).unwrap(), "\"Debian-8\"");
    }
}
