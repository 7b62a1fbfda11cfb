//! Hypervisor driver abstraction.
//!
//! A [`Driver`] translates lifecycle intent for one machine into invocations
//! of an external hypervisor tool. Drivers are obtained through a
//! [`DriverFactory`]; the production factory is the [`DriverRegistry`],
//! which knows each backend's tool, version flag and supported platforms.

// Standard library
use std::path::Path;
use std::time::Duration;

// External crates
use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// Internal imports
use hark_core::config::WaitSettings;
use hark_core::error::{HarkError, Result};
use hark_store::{DriverKind, Machine, PortMapping, Store};

pub mod guest;
pub mod registry;
pub mod status;
pub mod virtualbox;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use registry::{supported_drivers, Capability, DriverRegistry};
pub use status::MachineStatus;
pub use virtualbox::VirtualBoxDriver;

/// How [`Driver::wait_status`] polls.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_settings(&WaitSettings::default())
    }
}

impl WaitOptions {
    pub fn from_settings(settings: &WaitSettings) -> Self {
        Self {
            interval: settings.interval(),
            timeout: settings.timeout(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Lifecycle operations for a single machine.
#[async_trait]
pub trait Driver: Send + Sync {
    fn kind(&self) -> DriverKind;

    fn machine(&self) -> &Machine;

    /// Fails with [`HarkError::MachineNotFound`] when the hypervisor has no
    /// such machine registered.
    async fn status(&self) -> Result<MachineStatus>;

    /// Create the machine from a base image. The store is available for
    /// installation-wide state the driver needs to keep.
    async fn create(&self, base_image: &Path, store: &Store) -> Result<()>;

    async fn start(&self, gui: bool) -> Result<()>;

    /// Ask the guest to shut down. Returns once the request is delivered;
    /// use [`Driver::wait_status`] to wait for the transition.
    async fn stop(&self) -> Result<()>;

    async fn destroy(&self) -> Result<()>;

    async fn set_port_mappings(&self, mappings: &[PortMapping]) -> Result<()>;

    /// Fail with [`HarkError::InvalidStatus`] unless the current status is
    /// one of `allowed`.
    async fn assert_status(&self, allowed: &[MachineStatus]) -> Result<MachineStatus> {
        let current = self.status().await?;
        if allowed.contains(&current) {
            return Ok(current);
        }
        Err(HarkError::InvalidStatus {
            current: current.to_string(),
            allowed: allowed
                .iter()
                .map(MachineStatus::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Poll until the machine reaches `target`.
    async fn wait_status(&self, target: MachineStatus, options: &WaitOptions) -> Result<()> {
        let name = &self.machine().name;
        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            if options.cancel.is_cancelled() {
                return Err(HarkError::Cancelled(format!(
                    "waiting for '{}' to be {}",
                    name, target
                )));
            }

            let current = self.status().await?;
            if current == target {
                return Ok(());
            }
            debug!("Machine '{}' is {}, waiting for {}", name, current, target);

            let mut delay = options.interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(HarkError::Timeout(format!(
                        "machine '{}' is still {} after waiting for {}",
                        name, current, target
                    )));
                }
                delay = delay.min(deadline - now);
            }

            tokio::select! {
                _ = options.cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Produces the driver for a machine.
pub trait DriverFactory: Send + Sync {
    /// Fails with [`HarkError::UnsupportedDriver`] when the machine's driver
    /// cannot be used here.
    fn driver_for(&self, machine: &Machine) -> Result<Box<dyn Driver>>;
}
