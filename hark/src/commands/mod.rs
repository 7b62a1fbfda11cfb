// Command handlers

use std::process::ExitCode;
use tracing::debug;

use hark_driver::DriverRegistry;
use hark_orchestrator::LocalClient;

use crate::cli::Command;

pub mod drivers;
pub mod image;
pub mod log;
pub mod vm;

/// Main command dispatcher
pub async fn execute_command(client: &LocalClient, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Vm { command } => {
            debug!("Handling vm command: {:?}", command);
            vm::handle_vm_command(client, command).await
        }
        Command::Image { command } => {
            debug!("Handling image command: {:?}", command);
            image::handle_image_command(client, command).await
        }
        Command::Drivers => drivers::handle_drivers(client).await,
        Command::Log => log::handle_log(client),
    }
}

/// The driver registry for this host, using the configured private network.
pub(crate) fn registry(client: &LocalClient) -> anyhow::Result<DriverRegistry> {
    let network = client.context().network()?;
    Ok(DriverRegistry::detect(network)?)
}
