//! The local client: hark operations against one home directory.

// Standard library
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

// External crates
use tracing::{debug, warn};

// Internal imports
use hark_core::error::{HarkError, Result};
use hark_image::{find_image, Image};
use hark_network::{free_port, PortSource};
use hark_store::{
    Constraints, DriverKind, Guest, Machine, NetworkInterface, PortMapping, Record,
    PRIVATE_KIND, SSH_MAPPING_NAME,
};

use crate::context::HarkContext;

#[derive(Debug, Clone)]
pub struct LocalClient {
    context: HarkContext,
}

impl LocalClient {
    pub fn new(context: HarkContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &HarkContext {
        &self.context
    }

    /// Contents of the hark log file; empty if nothing has been logged yet.
    pub fn log(&self) -> Result<String> {
        match std::fs::read_to_string(self.context.log_file()) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn machines(&self) -> Result<Vec<Machine>> {
        self.context.store().read_all().await
    }

    pub async fn create_machine(&self, machine: &Machine) -> Result<()> {
        debug!("Saving machine: {}", machine.describe());
        self.context.store().create(machine).await
    }

    /// The machine called `name`.
    pub async fn get_machine(&self, name: &str) -> Result<Machine> {
        let mut found: Vec<Machine> = self
            .context
            .store()
            .read(&Constraints::new().eq("name", name))
            .await?;
        match found.len() {
            0 => Err(HarkError::MachineNotFound(name.to_string())),
            1 => Ok(found.remove(0)),
            n => Err(HarkError::Internal(format!(
                "{} machines found for name '{}'",
                n, name
            ))),
        }
    }

    /// Delete a machine with its port mappings and network interfaces.
    pub async fn delete_machine(&self, machine: &Machine) -> Result<()> {
        self.context.store().delete_machine(machine).await
    }

    pub async fn port_mappings(&self) -> Result<Vec<PortMapping>> {
        self.context.store().read_all().await
    }

    pub async fn port_mappings_where(&self, constraints: &Constraints) -> Result<Vec<PortMapping>> {
        self.context.store().read(constraints).await
    }

    pub async fn create_port_mapping(&self, mapping: &PortMapping) -> Result<()> {
        self.context.store().create(mapping).await
    }

    /// The machine's SSH mapping, if one was configured.
    pub async fn ssh_mapping(&self, machine: &Machine) -> Result<Option<PortMapping>> {
        let constraints = Constraints::new()
            .eq("name", SSH_MAPPING_NAME)
            .eq("machine_id", &machine.machine_id);
        Ok(self.port_mappings_where(&constraints).await?.into_iter().next())
    }

    /// A host port not used by any recorded mapping.
    pub async fn free_host_port(&self, source: &mut dyn PortSource) -> Result<u16> {
        let used: HashSet<u16> = self
            .port_mappings()
            .await?
            .iter()
            .map(|mapping| mapping.host_port)
            .collect();
        free_port(source, &used)
    }

    pub async fn network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        self.context.store().read_all().await
    }

    pub async fn create_network_interface(&self, interface: &NetworkInterface) -> Result<()> {
        self.context.store().create(interface).await
    }

    /// A private address not assigned to any machine.
    pub async fn free_private_ip(&self) -> Result<Ipv4Addr> {
        let assigned: Vec<NetworkInterface> = self
            .context
            .store()
            .read(&Constraints::new().eq("kind", PRIVATE_KIND))
            .await?;
        let used: HashSet<Ipv4Addr> = assigned
            .iter()
            .filter_map(|iface| match iface.addr.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    warn!("Ignoring unparseable private address '{}'", iface.addr);
                    None
                }
            })
            .collect();
        self.context.network()?.free_address(&used)
    }

    /// Locally cached images, by ascending version.
    pub fn images(&self) -> Result<Vec<Image>> {
        self.context.image_cache().images()
    }

    /// The best cached image for a driver and guest.
    pub fn find_image(&self, driver: DriverKind, guest: Guest) -> Result<Image> {
        find_image(&self.images()?, driver, guest)
    }

    pub fn image_path(&self, image: &Image) -> PathBuf {
        self.context.image_cache().full_image_path(image)
    }

    pub fn save_image_from_file(&self, image: &Image, source: &Path) -> Result<PathBuf> {
        self.context.image_cache().save_from_file(image, source)
    }
}
