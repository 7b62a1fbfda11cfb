//! The host-only network and private address allocation.

// Standard library
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

// Internal imports
use hark_core::error::{HarkError, Result};

/// An IPv4 subnet in CIDR notation, e.g. `192.168.56.0/24`.
///
/// The first host address belongs to the host side of the interface; guests
/// are given addresses after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    base: Ipv4Addr,
    prefix: u8,
}

impl Network {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if !(1..=30).contains(&prefix) {
            return Err(HarkError::Config(format!(
                "subnet prefix must be between 1 and 30, got /{}",
                prefix
            )));
        }
        let mask = u32::MAX << (32 - prefix);
        Ok(Self {
            base: Ipv4Addr::from(u32::from(addr) & mask),
            prefix,
        })
    }

    fn first(&self) -> u32 {
        u32::from(self.base)
    }

    fn broadcast(&self) -> u32 {
        self.first() | (u32::MAX >> self.prefix)
    }

    /// The address assigned to the host side of the interface.
    pub fn host_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.first() + 1)
    }

    /// Guest-assignable addresses, in ascending order.
    pub fn guest_addresses(&self) -> impl Iterator<Item = Ipv4Addr> {
        (self.first() + 2..self.broadcast()).map(Ipv4Addr::from)
    }

    /// The lowest guest address not in `exclude`.
    pub fn free_address(&self, exclude: &HashSet<Ipv4Addr>) -> Result<Ipv4Addr> {
        self.guest_addresses()
            .find(|addr| !exclude.contains(addr))
            .ok_or_else(|| {
                HarkError::Network(format!("no free private address left in {}", self))
            })
    }
}

impl FromStr for Network {
    type Err = HarkError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HarkError::Config(format!("invalid subnet '{}'", s));
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        Self::new(addr, prefix)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_network() -> Network {
        "192.168.56.0/24".parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let net: Network = "10.0.3.17/16".parse().unwrap();
        assert_eq!(net.to_string(), "10.0.0.0/16");
        assert!(matches!(
            "10.0.0.0".parse::<Network>().unwrap_err(),
            HarkError::Config(_)
        ));
        assert!("10.0.0.0/31".parse::<Network>().is_err());
        assert!("nonsense/24".parse::<Network>().is_err());
    }

    #[test]
    fn test_host_address() {
        assert_eq!(
            default_network().host_address(),
            Ipv4Addr::new(192, 168, 56, 1)
        );
    }

    #[test]
    fn test_free_address_skips_excluded() {
        let net = default_network();
        assert_eq!(
            net.free_address(&HashSet::new()).unwrap(),
            Ipv4Addr::new(192, 168, 56, 2)
        );

        let exclude: HashSet<Ipv4Addr> = [
            Ipv4Addr::new(192, 168, 56, 2),
            Ipv4Addr::new(192, 168, 56, 3),
            Ipv4Addr::new(192, 168, 56, 5),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            net.free_address(&exclude).unwrap(),
            Ipv4Addr::new(192, 168, 56, 4)
        );
    }

    #[test]
    fn test_exhausted_network_fails() {
        let net: Network = "10.1.1.0/30".parse().unwrap();
        let exclude: HashSet<Ipv4Addr> = net.guest_addresses().collect();
        assert_eq!(exclude.len(), 1);
        let err = net.free_address(&exclude).unwrap_err();
        assert!(matches!(err, HarkError::Network(_)));
    }
}
