//! VirtualBox driver, driven through `VBoxManage`.

// Standard library
use std::path::Path;
use std::sync::Arc;

// External crates
use async_trait::async_trait;
use tracing::debug;

// Internal imports
use hark_core::command::{Command, CommandOutput, CommandRunner};
use hark_core::error::{HarkError, Result};
use hark_network::Network;
use hark_store::{DriverKind, Machine, PortMapping, Store};

use crate::guest::virtualbox_os_type;
use crate::status::{parse_machine_readable, MachineStatus};
use crate::Driver;

mod host_only;

pub use host_only::HOST_ONLY_INTERFACE_CFG_KEY;

const VBOX_MANAGE: &str = "VBoxManage";
const STORAGE_CONTROLLER: &str = "sata1";
const MEDIUM_LOCKED: &str = "is locked for reading by another task";
const NOT_REGISTERED: &str = "Could not find a registered machine";

/// `{name},tcp,,{host_port},,{guest_port}`
pub fn format_port_mapping(mapping: &PortMapping) -> String {
    format!(
        "{},tcp,,{},,{}",
        mapping.name, mapping.host_port, mapping.guest_port
    )
}

pub struct VirtualBoxDriver {
    machine: Machine,
    runner: Arc<dyn CommandRunner>,
    network: Network,
}

impl VirtualBoxDriver {
    pub fn new(machine: Machine, runner: Arc<dyn CommandRunner>, network: Network) -> Self {
        Self {
            machine,
            runner,
            network,
        }
    }

    fn name(&self) -> &str {
        &self.machine.name
    }

    fn vbox<I, S>(args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::new(VBOX_MANAGE).args(args)
    }

    fn modifyvm(&self, args: &[&str]) -> Command {
        Self::vbox(["modifyvm", self.name()]).args(args.iter().copied())
    }

    async fn run(&self, command: &Command) -> Result<CommandOutput> {
        self.runner.assert_run(command).await
    }

    /// Everything up to (not including) storage, in order.
    fn create_commands(&self, host_only_interface: &str) -> Vec<Command> {
        let memory = self.machine.memory_mb.to_string();
        vec![
            Self::vbox(["createvm", "--name", self.name(), "--register"]),
            self.modifyvm(&["--ostype", virtualbox_os_type(self.machine.guest)]),
            self.modifyvm(&["--acpi", "on"]),
            self.modifyvm(&["--ioapic", "on"]),
            self.modifyvm(&["--memory", &memory]),
            self.modifyvm(&["--nic1", "nat"]),
            self.modifyvm(&[
                "--nic2",
                "hostonly",
                "--hostonlyadapter2",
                host_only_interface,
            ]),
            self.modifyvm(&["--nictype1", "virtio"]),
            self.modifyvm(&["--nictype2", "virtio"]),
        ]
    }

    fn attach_command(&self, base_image: &Path, multiattach: bool) -> Command {
        let medium = base_image.display().to_string();
        let command = Self::vbox([
            "storageattach",
            self.name(),
            "--storagectl",
            STORAGE_CONTROLLER,
            "--port",
            "0",
            "--device",
            "0",
            "--type",
            "hdd",
            "--medium",
            medium.as_str(),
        ]);
        if multiattach {
            command.args(["--mtype", "multiattach"])
        } else {
            command
        }
    }

    /// Attach the base image copy-on-write. Multiattach only needs
    /// requesting the first time a medium is used; after that VirtualBox
    /// reports it as locked and a plain attach does the right thing.
    async fn attach_storage(&self, base_image: &Path) -> Result<()> {
        self.run(&Self::vbox([
            "storagectl",
            self.name(),
            "--name",
            STORAGE_CONTROLLER,
            "--add",
            "sata",
        ]))
        .await?;

        match self.run(&self.attach_command(base_image, true)).await {
            Ok(_) => Ok(()),
            Err(HarkError::CommandFailed { ref stderr, .. }) if stderr.contains(MEDIUM_LOCKED) => {
                debug!(
                    "virtualbox: medium already registered, attaching '{}' without multiattach",
                    base_image.display()
                );
                self.run(&self.attach_command(base_image, false)).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Driver for VirtualBoxDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::VirtualBox
    }

    fn machine(&self) -> &Machine {
        &self.machine
    }

    async fn status(&self) -> Result<MachineStatus> {
        let output = match self
            .run(&Self::vbox(["showvminfo", self.name(), "--machinereadable"]))
            .await
        {
            Ok(output) => output,
            Err(HarkError::CommandFailed { ref stderr, .. }) if stderr.contains(NOT_REGISTERED) => {
                return Err(HarkError::MachineNotFound(self.name().to_string()));
            }
            Err(e) => return Err(e),
        };
        let info = parse_machine_readable(&output.stdout);
        let state = info.get("VMState").map(String::as_str).unwrap_or_default();
        MachineStatus::from_vm_state(state)
    }

    async fn create(&self, base_image: &Path, store: &Store) -> Result<()> {
        let interface = self.host_only_interface(store).await?;

        debug!("virtualbox: Creating machine '{}'", self.name());
        debug!("virtualbox: base image will be '{}'", base_image.display());
        for command in self.create_commands(&interface) {
            self.run(&command).await?;
        }
        self.attach_storage(base_image).await
    }

    async fn start(&self, gui: bool) -> Result<()> {
        debug!("virtualbox: Starting machine '{}'", self.name());
        let ui_type = if gui { "gui" } else { "headless" };
        self.run(&Self::vbox(["startvm", self.name(), "--type", ui_type]))
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        debug!("virtualbox: Stopping machine '{}'", self.name());
        self.run(&Self::vbox(["controlvm", self.name(), "acpipowerbutton"]))
            .await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        debug!("virtualbox: Destroying machine '{}'", self.name());
        self.run(&Self::vbox(["unregistervm", self.name(), "--delete"]))
            .await?;
        Ok(())
    }

    async fn set_port_mappings(&self, mappings: &[PortMapping]) -> Result<()> {
        for mapping in mappings {
            let rule = format_port_mapping(mapping);
            self.run(&self.modifyvm(&["--natpf1", &rule])).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingRunner;
    use crate::WaitOptions;
    use hark_store::test_utils::create_test_store;
    use hark_store::{ConfigEntry, Guest};
    use std::time::Duration;

    fn vbox_driver() -> (VirtualBoxDriver, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner::new());
        let machine = Machine::new("hark-vm", DriverKind::VirtualBox, Guest::Debian8, 1024);
        let network = "192.168.56.0/24".parse().unwrap();
        (
            VirtualBoxDriver::new(machine, runner.clone(), network),
            runner,
        )
    }

    #[test]
    fn test_port_mapping_rule() {
        let mapping = PortMapping::ssh("abc", 2222);
        assert_eq!(format_port_mapping(&mapping), "ssh,tcp,,2222,,22");
    }

    #[tokio::test]
    async fn test_status_parses_vm_state() {
        let (driver, runner) = vbox_driver();
        runner.respond(
            "showvminfo hark-vm --machinereadable",
            0,
            "name=\"hark-vm\"\nVMState=\"running\"\n",
            "",
        );
        assert_eq!(driver.status().await.unwrap(), MachineStatus::Running);
    }

    #[tokio::test]
    async fn test_status_of_unregistered_machine() {
        let (driver, runner) = vbox_driver();
        runner.respond(
            "showvminfo",
            1,
            "",
            "VBoxManage: error: Could not find a registered machine named 'hark-vm'",
        );
        let err = driver.status().await.unwrap_err();
        assert!(matches!(err, HarkError::MachineNotFound(ref name) if name == "hark-vm"));
    }

    #[tokio::test]
    async fn test_status_unrecognised_state() {
        let (driver, runner) = vbox_driver();
        runner.respond("showvminfo", 0, "VMState=\"gurumeditation\"\n", "");
        let err = driver.status().await.unwrap_err();
        assert!(matches!(err, HarkError::UnrecognisedMachineState(_)));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let (driver, runner) = vbox_driver();
        runner.respond("startvm", 1, "", "VBoxManage: error: no such machine");
        let err = driver.start(false).await.unwrap_err();
        match err {
            HarkError::CommandFailed {
                command,
                exit_status,
                stderr,
            } => {
                assert_eq!(command, "VBoxManage startvm hark-vm --type headless");
                assert_eq!(exit_status, 1);
                assert!(stderr.contains("no such machine"));
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_commands() {
        let (driver, runner) = vbox_driver();
        driver.start(true).await.unwrap();
        driver.stop().await.unwrap();
        driver
            .set_port_mappings(&[PortMapping::ssh("abc", 4022)])
            .await
            .unwrap();
        driver.destroy().await.unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "VBoxManage startvm hark-vm --type gui",
                "VBoxManage controlvm hark-vm acpipowerbutton",
                "VBoxManage modifyvm hark-vm --natpf1 ssh,tcp,,4022,,22",
                "VBoxManage unregistervm hark-vm --delete",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_sets_up_host_only_interface_once() {
        let store = create_test_store().await;
        let (driver, runner) = vbox_driver();
        runner.respond(
            "hostonlyif create",
            0,
            "0%...100%\nInterface 'vboxnet3' was successfully created\n",
            "",
        );

        driver
            .create(Path::new("/images/virtualbox_Debian-8_v1.vmdk"), &store)
            .await
            .expect("Failed to create machine");

        let lines = runner.command_lines();
        assert_eq!(
            lines,
            vec![
                "VBoxManage hostonlyif create",
                "VBoxManage hostonlyif ipconfig vboxnet3 --ip 192.168.56.1",
                "VBoxManage createvm --name hark-vm --register",
                "VBoxManage modifyvm hark-vm --ostype Debian_64",
                "VBoxManage modifyvm hark-vm --acpi on",
                "VBoxManage modifyvm hark-vm --ioapic on",
                "VBoxManage modifyvm hark-vm --memory 1024",
                "VBoxManage modifyvm hark-vm --nic1 nat",
                "VBoxManage modifyvm hark-vm --nic2 hostonly --hostonlyadapter2 vboxnet3",
                "VBoxManage modifyvm hark-vm --nictype1 virtio",
                "VBoxManage modifyvm hark-vm --nictype2 virtio",
                "VBoxManage storagectl hark-vm --name sata1 --add sata",
                "VBoxManage storageattach hark-vm --storagectl sata1 --port 0 --device 0 --type hdd --medium /images/virtualbox_Debian-8_v1.vmdk --mtype multiattach",
            ]
        );

        let saved: Vec<ConfigEntry> = store.read_all().await.unwrap();
        assert_eq!(
            saved,
            vec![ConfigEntry::new(HOST_ONLY_INTERFACE_CFG_KEY, "vboxnet3")]
        );

        // A second machine reuses the recorded interface.
        let (second, runner) = vbox_driver();
        runner.respond("list hostonlyifs", 0, "Name:            vboxnet3\n", "");
        second
            .create(Path::new("/images/virtualbox_Debian-8_v1.vmdk"), &store)
            .await
            .expect("Failed to create second machine");
        let lines = runner.command_lines();
        assert_eq!(lines[0], "VBoxManage list hostonlyifs");
        assert!(lines.iter().all(|line| !line.contains("hostonlyif create")));
    }

    #[tokio::test]
    async fn test_missing_recorded_interface_is_recreated() {
        let store = create_test_store().await;
        store
            .create(&ConfigEntry::new(HOST_ONLY_INTERFACE_CFG_KEY, "vboxnet0"))
            .await
            .unwrap();
        let (driver, runner) = vbox_driver();
        runner.respond("list hostonlyifs", 0, "Name:            vboxnet7\n", "");
        runner.respond(
            "hostonlyif create",
            0,
            "Interface 'vboxnet8' was successfully created\n",
            "",
        );

        driver
            .create(Path::new("/img.vmdk"), &store)
            .await
            .expect("Failed to create machine");

        let lines = runner.command_lines();
        assert_eq!(
            &lines[..3],
            &[
                "VBoxManage list hostonlyifs",
                "VBoxManage hostonlyif create",
                "VBoxManage hostonlyif ipconfig vboxnet8 --ip 192.168.56.1",
            ]
        );
        let saved: Vec<ConfigEntry> = store.read_all().await.unwrap();
        assert_eq!(
            saved,
            vec![ConfigEntry::new(HOST_ONLY_INTERFACE_CFG_KEY, "vboxnet8")]
        );
    }

    #[tokio::test]
    async fn test_attach_falls_back_when_medium_locked() {
        let store = create_test_store().await;
        store
            .create(&ConfigEntry::new(HOST_ONLY_INTERFACE_CFG_KEY, "vboxnet0"))
            .await
            .unwrap();
        let (driver, runner) = vbox_driver();
        runner.respond("list hostonlyifs", 0, "Name:            vboxnet0\n", "");
        runner.respond(
            "--mtype multiattach",
            1,
            "",
            "VBoxManage: error: Medium '/img.vmdk' is locked for reading by another task",
        );

        driver.create(Path::new("/img.vmdk"), &store).await.unwrap();

        let lines = runner.command_lines();
        let attaches: Vec<&String> = lines
            .iter()
            .filter(|l| l.contains("storageattach"))
            .collect();
        assert_eq!(attaches.len(), 2);
        assert!(attaches[0].ends_with("--mtype multiattach"));
        assert!(attaches[1].ends_with("--medium /img.vmdk"));
    }

    #[tokio::test]
    async fn test_attach_other_failures_propagate() {
        let store = create_test_store().await;
        store
            .create(&ConfigEntry::new(HOST_ONLY_INTERFACE_CFG_KEY, "vboxnet0"))
            .await
            .unwrap();
        let (driver, runner) = vbox_driver();
        runner.respond("list hostonlyifs", 0, "Name:            vboxnet0\n", "");
        runner.respond("storageattach", 1, "", "disk on fire");

        let err = driver.create(Path::new("/img.vmdk"), &store).await.unwrap_err();
        assert!(matches!(err, HarkError::CommandFailed { .. }));
        assert_eq!(
            runner
                .command_lines()
                .iter()
                .filter(|l| l.contains("storageattach"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_assert_status() {
        let (driver, runner) = vbox_driver();
        runner.respond("showvminfo", 0, "VMState=\"paused\"\n", "");

        let status = driver
            .assert_status(&[MachineStatus::Paused, MachineStatus::Running])
            .await
            .unwrap();
        assert_eq!(status, MachineStatus::Paused);

        let err = driver
            .assert_status(&[MachineStatus::Stopped])
            .await
            .unwrap_err();
        assert!(matches!(err, HarkError::InvalidStatus { ref current, .. } if current == "paused"));
    }

    #[tokio::test]
    async fn test_wait_status_times_out() {
        let (driver, runner) = vbox_driver();
        runner.respond("showvminfo", 0, "VMState=\"running\"\n", "");
        let options = WaitOptions {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_millis(30)),
            ..WaitOptions::default()
        };

        let err = driver
            .wait_status(MachineStatus::Stopped, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, HarkError::Timeout(_)));
        assert!(runner.calls().len() >= 2);
    }
}
