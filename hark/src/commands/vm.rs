//! `hark vm ...`

use std::process::ExitCode;

use colored::Colorize;
use tracing::info;

use hark_core::HarkError;
use hark_driver::{DriverFactory, MachineStatus, WaitOptions};
use hark_orchestrator::{DestroyMachine, LocalClient, NewMachine, Outcome, Procedure};
use hark_store::{Machine, PortMapping, Record, Value};

use super::registry;
use crate::cli::VmSubcommand;
use crate::output::{print_messages, print_table};

pub async fn handle_vm_command(
    client: &LocalClient,
    command: VmSubcommand,
) -> anyhow::Result<ExitCode> {
    match command {
        VmSubcommand::List => list(client).await,
        VmSubcommand::New {
            name,
            driver,
            guest,
            memory_mb,
            gui_start,
        } => {
            let machine = Machine::new(name, driver.parse()?, guest.parse()?, memory_mb);
            new(client, machine, gui_start).await
        }
        VmSubcommand::Start { name, gui } => start(client, &name, gui).await,
        VmSubcommand::Stop { name } => stop(client, &name).await,
        VmSubcommand::Destroy { name } => destroy(client, &name).await,
        VmSubcommand::Mappings => mappings(client).await,
    }
}

/// Column text without the quoting `Value` uses in constraint output.
fn cell(value: Value) -> String {
    match value {
        Value::Text(text) => text,
        other => other.to_string(),
    }
}

fn rows<R: Record>(records: &[R]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| R::FIELDS.iter().map(|f| cell(record.value(f))).collect())
        .collect()
}

/// Look up a machine, reporting a missing one to the operator.
async fn find_machine(client: &LocalClient, name: &str) -> anyhow::Result<Option<Machine>> {
    match client.get_machine(name).await {
        Ok(machine) => Ok(Some(machine)),
        Err(HarkError::MachineNotFound(_)) => {
            eprintln!("{}", format!("Machine not found: {}", name).red());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn wait_options(client: &LocalClient) -> WaitOptions {
    WaitOptions::from_settings(&client.context().config().wait)
}

async fn print_ssh_hint(client: &LocalClient, machine: &Machine) -> anyhow::Result<()> {
    if let Some(mapping) = client.ssh_mapping(machine).await? {
        println!(
            "SSH is forwarded from localhost:{} to '{}' port {}",
            mapping.host_port, machine.name, mapping.guest_port
        );
    }
    Ok(())
}

async fn list(client: &LocalClient) -> anyhow::Result<ExitCode> {
    let machines = client.machines().await?;
    println!(
        "{}",
        format!("vm list: found {} hark machines", machines.len()).green()
    );
    print_table(Machine::FIELDS, &rows(&machines));
    Ok(ExitCode::SUCCESS)
}

async fn mappings(client: &LocalClient) -> anyhow::Result<ExitCode> {
    let mappings = client.port_mappings().await?;
    println!(
        "{}",
        format!("vm mappings: found {} configured port mappings", mappings.len()).green()
    );
    print_table(PortMapping::FIELDS, &rows(&mappings));
    Ok(ExitCode::SUCCESS)
}

async fn new(client: &LocalClient, machine: Machine, gui_start: bool) -> anyhow::Result<ExitCode> {
    let registry = registry(client)?;

    let mut procedure = NewMachine::new(client, &registry, machine.clone());
    let outcome = procedure.run().await;
    print_messages(procedure.messages());
    if outcome? == Outcome::Aborted {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(interface) = procedure.private_interface() {
        println!("Private address: {}", interface.addr);
    }

    if gui_start {
        let driver = registry.driver_for(&machine)?;
        println!("Starting machine: {}", machine.name);
        driver.start(true).await?;
        driver
            .wait_status(MachineStatus::Running, &wait_options(client))
            .await?;
        println!("Done.");
    }
    print_ssh_hint(client, &machine).await?;
    Ok(ExitCode::SUCCESS)
}

async fn start(client: &LocalClient, name: &str, gui: bool) -> anyhow::Result<ExitCode> {
    let Some(machine) = find_machine(client, name).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let driver = registry(client)?.driver_for(&machine)?;
    driver
        .assert_status(&[MachineStatus::Stopped, MachineStatus::Aborted])
        .await?;

    println!("Starting machine: {}", machine.name);
    driver.start(gui).await?;
    driver
        .wait_status(MachineStatus::Running, &wait_options(client))
        .await?;
    info!("Started machine '{}'", machine.name);
    println!("Done.");

    print_ssh_hint(client, &machine).await?;
    Ok(ExitCode::SUCCESS)
}

async fn stop(client: &LocalClient, name: &str) -> anyhow::Result<ExitCode> {
    let Some(machine) = find_machine(client, name).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let driver = registry(client)?.driver_for(&machine)?;
    driver
        .assert_status(&[MachineStatus::Running, MachineStatus::Paused])
        .await?;

    println!("Stopping machine: {}", machine.name);
    driver.stop().await?;
    driver
        .wait_status(MachineStatus::Stopped, &wait_options(client))
        .await?;
    info!("Stopped machine '{}'", machine.name);
    println!("Done.");
    Ok(ExitCode::SUCCESS)
}

async fn destroy(client: &LocalClient, name: &str) -> anyhow::Result<ExitCode> {
    let Some(machine) = find_machine(client, name).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let registry = registry(client)?;

    let mut procedure = DestroyMachine::new(client, &registry, machine);
    let outcome = procedure.run().await;
    print_messages(procedure.messages());
    match outcome? {
        Outcome::Completed => Ok(ExitCode::SUCCESS),
        Outcome::Aborted => Ok(ExitCode::FAILURE),
    }
}
