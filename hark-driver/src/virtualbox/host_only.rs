//! The installation-wide host-only interface machines share.

// Standard library
use std::sync::OnceLock;

// External crates
use regex::Regex;
use tracing::{debug, warn};

// Internal imports
use hark_core::error::{HarkError, Result};
use hark_store::{ConfigEntry, Constraints, Store};

use super::VirtualBoxDriver;

/// Config entry recording the interface name once it has been created.
pub const HOST_ONLY_INTERFACE_CFG_KEY: &str = "virtualbox_host_only_interface";

static CREATED_RE: OnceLock<Regex> = OnceLock::new();

fn created_re() -> &'static Regex {
    CREATED_RE.get_or_init(|| {
        Regex::new(r"Interface '(.+)' was successfully created")
            .expect("Invalid host-only interface pattern")
    })
}

/// The interface name from `hostonlyif create` output.
pub(super) fn parse_created_interface(stdout: &str) -> Option<String> {
    created_re()
        .captures(stdout)
        .map(|caps| caps[1].to_string())
}

/// `Name:` values from `list hostonlyifs` output.
pub(super) fn parse_interface_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Name:"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

impl VirtualBoxDriver {
    /// The hark host-only interface, created and recorded on first use.
    pub(super) async fn host_only_interface(&self, store: &Store) -> Result<String> {
        let recorded: Vec<ConfigEntry> = store
            .read(&Constraints::new().eq("name", HOST_ONLY_INTERFACE_CFG_KEY))
            .await?;
        if let Some(entry) = recorded.into_iter().next() {
            if self.host_only_interfaces().await?.contains(&entry.value) {
                return Ok(entry.value);
            }
            warn!(
                "virtualbox: recorded host-only interface {} no longer exists",
                entry.value
            );
            store.delete(&entry).await?;
        }

        let name = self.create_host_only_interface().await?;
        store
            .create(&ConfigEntry::new(HOST_ONLY_INTERFACE_CFG_KEY, &name))
            .await?;
        Ok(name)
    }

    /// Names of the host-only interfaces VirtualBox currently knows about.
    async fn host_only_interfaces(&self) -> Result<Vec<String>> {
        let output = self.run(&Self::vbox(["list", "hostonlyifs"])).await?;
        Ok(parse_interface_names(&output.stdout))
    }

    async fn create_host_only_interface(&self) -> Result<String> {
        let command = Self::vbox(["hostonlyif", "create"]);
        let output = self.run(&command).await?;
        let name = parse_created_interface(&output.stdout).ok_or_else(|| {
            HarkError::Internal(format!(
                "Could not parse output of '{}': '{}'",
                command, output.stdout
            ))
        })?;
        debug!("virtualbox: created new host-only interface: {}", name);

        let addr = self.network.host_address().to_string();
        self.run(&Self::vbox(["hostonlyif", "ipconfig", name.as_str(), "--ip", addr.as_str()]))
            .await?;
        debug!(
            "virtualbox: assigned addr {} to host-only interface {}",
            addr, name
        );
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_created_interface() {
        let out = "0%...10%...100%\nInterface 'vboxnet0' was successfully created\n";
        assert_eq!(parse_created_interface(out), Some("vboxnet0".to_string()));
        assert_eq!(parse_created_interface("something else"), None);
    }

    #[test]
    fn test_parse_interface_names() {
        let out = "Name:            vboxnet0\nGUID:            786f6276-656e-4074-8000-0a0027000000\n\
                   IPAddress:       192.168.56.1\n\nName:            vboxnet1\nDHCP:            Disabled\n";
        assert_eq!(parse_interface_names(out), vec!["vboxnet0", "vboxnet1"]);
        assert!(parse_interface_names("").is_empty());
    }
}
