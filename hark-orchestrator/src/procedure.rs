//! Multi-step workflows over the store, a driver and the allocators.
//!
//! A procedure accumulates `(level, message)` entries for the operator. A
//! step can abort the procedure after explaining why; an abort is an
//! expected outcome, not an error. Any other failure propagates and leaves
//! whatever earlier steps did in place.

// Standard library
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// External crates
use async_trait::async_trait;
use tracing::{info, instrument, warn};

// Internal imports
use hark_core::error::{HarkError, Result};
use hark_driver::{Driver, DriverFactory, MachineStatus, WaitOptions};
use hark_network::{OsPortSource, PortSource, WorkflowLock};
use hark_store::{Machine, NetworkInterface, PortMapping, Record};

use crate::client::LocalClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => f.write_str("info"),
            Level::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted,
}

/// Why a run stopped early.
enum Interrupt {
    Abort,
    Failed(HarkError),
}

impl From<HarkError> for Interrupt {
    fn from(err: HarkError) -> Self {
        Interrupt::Failed(err)
    }
}

type Step<T = ()> = std::result::Result<T, Interrupt>;

fn finish(result: Step) -> Result<Outcome> {
    match result {
        Ok(()) => Ok(Outcome::Completed),
        Err(Interrupt::Abort) => Ok(Outcome::Aborted),
        Err(Interrupt::Failed(err)) => Err(err),
    }
}

/// Ordered operator messages.
#[derive(Debug, Default, Clone)]
pub struct Messages(Vec<Message>);

impl Messages {
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Level::Info, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Level::Error, text.into());
    }

    fn push(&mut self, level: Level, text: String) {
        self.0.push(Message { level, text });
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }
}

#[async_trait]
pub trait Procedure: Send {
    /// Run to completion or abort. Errors are failures that were not
    /// turned into an abort.
    async fn run(&mut self) -> Result<Outcome>;

    /// Messages accumulated so far.
    fn messages(&self) -> &[Message];
}

/// Take the workflow lock on the blocking pool.
async fn acquire_lock(path: PathBuf, timeout: Duration) -> Result<WorkflowLock> {
    tokio::task::spawn_blocking(move || WorkflowLock::acquire(&path, timeout))
        .await
        .map_err(|e| HarkError::Internal(format!("lock task failed: {}", e)))?
}

/// Create a machine: resolve its image, record it, create it in the
/// hypervisor, then give it an SSH port forward and a private address.
pub struct NewMachine<'a> {
    client: &'a LocalClient,
    drivers: &'a dyn DriverFactory,
    machine: Machine,
    port_source: Box<dyn PortSource>,
    lock_timeout: Duration,
    messages: Messages,
    ssh_port_mapping: Option<PortMapping>,
    private_interface: Option<NetworkInterface>,
}

impl<'a> NewMachine<'a> {
    pub fn new(client: &'a LocalClient, drivers: &'a dyn DriverFactory, machine: Machine) -> Self {
        let lock_timeout = client.context().config().lock_timeout();
        Self {
            client,
            drivers,
            machine,
            port_source: Box::new(OsPortSource),
            lock_timeout,
            messages: Messages::default(),
            ssh_port_mapping: None,
            private_interface: None,
        }
    }

    pub fn with_port_source(mut self, source: Box<dyn PortSource>) -> Self {
        self.port_source = source;
        self
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn ssh_port_mapping(&self) -> Option<&PortMapping> {
        self.ssh_port_mapping.as_ref()
    }

    pub fn private_interface(&self) -> Option<&NetworkInterface> {
        self.private_interface.as_ref()
    }


    #[instrument(skip_all, fields(machine = %self.machine.name))]
    async fn steps(&mut self) -> Step {
        let _lock = acquire_lock(self.client.context().lock_path(), self.lock_timeout).await?;
        let driver = self.drivers.driver_for(&self.machine)?;

        let base_image = match self.client.find_image(self.machine.driver, self.machine.guest) {
            Ok(image) => self.client.image_path(&image),
            Err(HarkError::ImageNotFound(detail)) => {
                self.messages
                    .error(format!("Image not found locally: {}", detail));
                self.messages
                    .error("Run 'hark image pull' to download it first.");
                return Err(Interrupt::Abort);
            }
            Err(e) => return Err(e.into()),
        };

        // Recording the machine first catches duplicates before the
        // hypervisor is touched.
        match self.client.create_machine(&self.machine).await {
            Ok(()) => {}
            Err(HarkError::DuplicateModel { .. }) => {
                self.messages.error(format!(
                    "Machine already exists with these options:\n\t{}",
                    self.machine.describe()
                ));
                return Err(Interrupt::Abort);
            }
            Err(e) => return Err(e.into()),
        }

        driver
            .create(&base_image, self.client.context().store())
            .await?;
        self.messages
            .info(format!("Created machine '{}'", self.machine.name));

        self.create_port_mapping(driver.as_ref()).await?;
        self.configure_network().await?;
        Ok(())
    }

    async fn create_port_mapping(&mut self, driver: &dyn Driver) -> Result<()> {
        let host_port = self
            .client
            .free_host_port(self.port_source.as_mut())
            .await?;
        let mapping = PortMapping::ssh(&self.machine.machine_id, host_port);

        driver.set_port_mappings(std::slice::from_ref(&mapping)).await?;
        self.client.create_port_mapping(&mapping).await?;

        self.messages.info(format!(
            "Configured ssh port mapping: host port {} -> guest port {}",
            mapping.host_port, mapping.guest_port
        ));
        self.ssh_port_mapping = Some(mapping);
        Ok(())
    }

    async fn configure_network(&mut self) -> Result<()> {
        let addr = self.client.free_private_ip().await?;
        let interface = NetworkInterface::private(&self.machine.machine_id, addr.to_string());
        self.client.create_network_interface(&interface).await?;

        self.messages
            .info(format!("Assigned private address {}", interface.addr));
        self.private_interface = Some(interface);
        Ok(())
    }
}

#[async_trait]
impl Procedure for NewMachine<'_> {
    async fn run(&mut self) -> Result<Outcome> {
        let outcome = finish(self.steps().await)?;
        info!("New machine procedure finished: {:?}", outcome);
        Ok(outcome)
    }

    fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }
}

/// Destroy a machine: stop it if needed, remove it from the hypervisor,
/// then delete its records.
pub struct DestroyMachine<'a> {
    client: &'a LocalClient,
    drivers: &'a dyn DriverFactory,
    machine: Machine,
    wait: WaitOptions,
    messages: Messages,
}

impl<'a> DestroyMachine<'a> {
    pub fn new(client: &'a LocalClient, drivers: &'a dyn DriverFactory, machine: Machine) -> Self {
        let wait = WaitOptions::from_settings(&client.context().config().wait);
        Self {
            client,
            drivers,
            machine,
            wait,
            messages: Messages::default(),
        }
    }

    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    #[instrument(skip_all, fields(machine = %self.machine.name))]
    async fn steps(&mut self) -> Step {
        let driver = self.drivers.driver_for(&self.machine)?;

        match driver.status().await {
            Ok(status) => {
                if matches!(status, MachineStatus::Running | MachineStatus::Paused) {
                    self.messages.info(format!(
                        "Machine status is '{}' - stopping it first.",
                        status
                    ));
                    driver.stop().await?;
                    driver.wait_status(MachineStatus::Stopped, &self.wait).await?;
                }
                driver.destroy().await?;
            }
            // Left behind by a create that failed before the hypervisor
            // registered it; only the records remain.
            Err(HarkError::MachineNotFound(_)) => {
                warn!(
                    "Machine '{}' is not registered with the {} driver",
                    self.machine.name, self.machine.driver
                );
                self.messages.info(format!(
                    "Machine '{}' does not exist in the hypervisor - removing its records.",
                    self.machine.name
                ));
            }
            Err(e) => return Err(e.into()),
        }

        self.client.delete_machine(&self.machine).await?;

        self.messages
            .info(format!("Destroyed machine '{}'", self.machine.name));
        Ok(())
    }
}

#[async_trait]
impl Procedure for DestroyMachine<'_> {
    async fn run(&mut self) -> Result<Outcome> {
        let outcome = finish(self.steps().await)?;
        info!("Destroy machine procedure finished: {:?}", outcome);
        Ok(outcome)
    }

    fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }
}
