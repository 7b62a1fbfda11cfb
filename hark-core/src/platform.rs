// Standard library
use std::env;
use std::fmt;

// Internal imports
use crate::error::{HarkError, Result};

/// Host operating systems hark knows how to reason about.
///
/// Maps `std::env::consts::OS` values to an enum so the driver registry can
/// decide which hypervisor backends are usable on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOS,
    Windows,
    FreeBsd,
}

impl Os {
    /// Detect the host operating system.
    pub fn current() -> Result<Self> {
        Self::from_name(env::consts::OS)
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "linux" => Ok(Os::Linux),
            "macos" => Ok(Os::MacOS),
            "windows" => Ok(Os::Windows),
            "freebsd" => Ok(Os::FreeBsd),
            other => Err(HarkError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Set to run as root anyway, e.g. inside a throwaway container.
pub const ALLOW_ROOT_ENV: &str = "HARK_ALLOW_ROOT";

/// Refuse to run hark as root or under sudo.
pub fn check_environment() -> Result<()> {
    let allowed = env::var_os(ALLOW_ROOT_ENV).is_some_and(|v| !v.is_empty() && v != "0");
    refuse_root(running_as_root(), allowed)
}

fn refuse_root(is_root: bool, allowed: bool) -> Result<()> {
    if is_root && !allowed {
        return Err(HarkError::BadEnvironment(
            "hark cannot be run as root, or with sudo".to_string(),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Os::Linux => "linux",
            Os::MacOS => "macos",
            Os::Windows => "windows",
            Os::FreeBsd => "freebsd",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_known() {
        assert_eq!(Os::from_name("linux").unwrap(), Os::Linux);
        assert_eq!(Os::from_name("macos").unwrap(), Os::MacOS);
        assert_eq!(Os::from_name("freebsd").unwrap(), Os::FreeBsd);
        assert_eq!(Os::from_name("windows").unwrap(), Os::Windows);
    }

    #[test]
    fn test_from_name_unknown() {
        let err = Os::from_name("plan9").unwrap_err();
        assert!(matches!(err, HarkError::UnknownPlatform(ref p) if p == "plan9"));
    }

    #[test]
    fn test_root_is_refused_unless_allowed() {
        let err = refuse_root(true, false).unwrap_err();
        assert!(matches!(err, HarkError::BadEnvironment(ref m) if m.contains("root")));
        assert!(refuse_root(true, true).is_ok());
        assert!(refuse_root(false, false).is_ok());
    }

    #[test]
    fn test_display_round_trips() {
        for os in [Os::Linux, Os::MacOS, Os::Windows, Os::FreeBsd] {
            assert_eq!(Os::from_name(&os.to_string()).unwrap(), os);
        }
    }
}
