//! Driver capabilities and platform support.

// Standard library
use std::sync::Arc;

// External crates
use tracing::debug;

// Internal imports
use hark_core::command::{which, Command, CommandRunner, SystemRunner};
use hark_core::error::{HarkError, Result};
use hark_core::platform::Os;
use hark_network::Network;
use hark_store::{DriverKind, Machine};

use crate::virtualbox::VirtualBoxDriver;
use crate::{Driver, DriverFactory};

/// The external tool behind a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub kind: DriverKind,
    pub command: &'static str,
    pub version_arg: &'static str,
    /// Whether hark ships an implementation for this driver.
    pub implemented: bool,
}

static VIRTUALBOX: Capability = Capability {
    kind: DriverKind::VirtualBox,
    command: "VBoxManage",
    version_arg: "-v",
    implemented: true,
};

static QEMU: Capability = Capability {
    kind: DriverKind::Qemu,
    command: "qemu-system-x86_64",
    version_arg: "--version",
    implemented: false,
};

/// Drivers that can run on a host platform.
pub fn supported_drivers(os: Os) -> &'static [DriverKind] {
    match os {
        Os::MacOS | Os::Windows | Os::FreeBsd => &[DriverKind::VirtualBox],
        Os::Linux => &[DriverKind::Qemu, DriverKind::VirtualBox],
    }
}

/// Built once at startup and passed to whatever needs a driver.
#[derive(Clone)]
pub struct DriverRegistry {
    os: Os,
    runner: Arc<dyn CommandRunner>,
    network: Network,
}

impl DriverRegistry {
    pub fn new(os: Os, runner: Arc<dyn CommandRunner>, network: Network) -> Self {
        Self {
            os,
            runner,
            network,
        }
    }

    /// A registry for this host that runs real subprocesses.
    pub fn detect(network: Network) -> Result<Self> {
        Ok(Self::new(Os::current()?, Arc::new(SystemRunner), network))
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn drivers(&self) -> &'static [DriverKind] {
        &DriverKind::ALL
    }

    pub fn capability(&self, kind: DriverKind) -> &'static Capability {
        match kind {
            DriverKind::VirtualBox => &VIRTUALBOX,
            DriverKind::Qemu => &QEMU,
        }
    }

    pub fn supports(&self, kind: DriverKind) -> bool {
        supported_drivers(self.os).contains(&kind)
    }

    /// Whether the driver's tool is on `PATH`.
    pub fn is_available(&self, kind: DriverKind) -> bool {
        which(self.capability(kind).command).is_some()
    }

    /// The tool's self-reported version.
    pub async fn version(&self, kind: DriverKind) -> Result<String> {
        let cap = self.capability(kind);
        let output = self
            .runner
            .assert_run(&Command::new(cap.command).arg(cap.version_arg))
            .await?;
        Ok(output.stdout.trim().to_string())
    }
}

impl DriverFactory for DriverRegistry {
    fn driver_for(&self, machine: &Machine) -> Result<Box<dyn Driver>> {
        let kind = machine.driver;
        if !self.supports(kind) {
            return Err(HarkError::UnsupportedDriver(format!(
                "{} is not supported on {}",
                kind, self.os
            )));
        }

        debug!("Using {} driver for machine '{}'", kind, machine.name);
        match kind {
            DriverKind::VirtualBox => Ok(Box::new(VirtualBoxDriver::new(
                machine.clone(),
                Arc::clone(&self.runner),
                self.network,
            ))),
            DriverKind::Qemu => Err(HarkError::UnsupportedDriver(format!(
                "{} has no driver implementation",
                kind
            ))),
        }
    }
}
