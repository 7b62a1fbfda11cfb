//! Free TCP port discovery.

// Standard library
use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};

// External crates
use tracing::debug;

// Internal imports
use hark_core::error::{HarkError, Result};

/// Upper bound on how many ports are drawn before giving up.
const MAX_ATTEMPTS: usize = 65535;

/// Something that hands out candidate ports.
pub trait PortSource: Send + Sync {
    fn next_port(&mut self) -> Result<u16>;
}

/// Asks the OS for an ephemeral port by binding port 0, then releases it.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsPortSource;

impl PortSource for OsPortSource {
    fn next_port(&mut self) -> Result<u16> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }
}

/// Draw ports from `source` until one is not in `exclude`.
///
/// The port is released before returning, so another process may take it
/// in between; callers hold the workflow lock and persist the result
/// straight away.
pub fn free_port(source: &mut dyn PortSource, exclude: &HashSet<u16>) -> Result<u16> {
    for _ in 0..MAX_ATTEMPTS {
        let port = source.next_port()?;
        if exclude.contains(&port) {
            debug!("Port {} is already mapped, trying another", port);
            continue;
        }
        return Ok(port);
    }

    Err(HarkError::Network(format!(
        "no free port found after {} attempts",
        MAX_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(std::ops::Range<u16>);

    impl PortSource for Scripted {
        fn next_port(&mut self) -> Result<u16> {
            self.0
                .next()
                .ok_or_else(|| HarkError::Network("script exhausted".into()))
        }
    }

    #[test]
    fn test_skips_excluded_ports() {
        let exclude: HashSet<u16> = [1000, 1001, 1002].into_iter().collect();
        let port = free_port(&mut Scripted(1000..1004), &exclude).unwrap();
        assert_eq!(port, 1003);
    }

    #[test]
    fn test_first_port_when_nothing_excluded() {
        let port = free_port(&mut Scripted(1000..1004), &HashSet::new()).unwrap();
        assert_eq!(port, 1000);
    }

    #[test]
    fn test_source_errors_propagate() {
        let exclude: HashSet<u16> = [1000].into_iter().collect();
        let err = free_port(&mut Scripted(1000..1001), &exclude).unwrap_err();
        assert!(matches!(err, HarkError::Network(_)));
    }

    #[test]
    fn test_os_source_returns_bindable_port() {
        let port = free_port(&mut OsPortSource, &HashSet::new()).unwrap();
        assert_ne!(port, 0);
    }
}
