//! Machine status state machine.

// Standard library
use std::collections::HashMap;
use std::fmt;

// Internal imports
use hark_core::error::{HarkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineStatus {
    Stopped,
    Running,
    Aborted,
    Paused,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Stopped => "stopped",
            MachineStatus::Running => "running",
            MachineStatus::Aborted => "aborted",
            MachineStatus::Paused => "paused",
        }
    }

    /// Map a VirtualBox `VMState` value.
    pub fn from_vm_state(state: &str) -> Result<Self> {
        match state {
            "poweroff" => Ok(MachineStatus::Stopped),
            "running" => Ok(MachineStatus::Running),
            "paused" => Ok(MachineStatus::Paused),
            "aborted" => Ok(MachineStatus::Aborted),
            other => Err(HarkError::UnrecognisedMachineState(other.to_string())),
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a flat `key="value"` block such as `showvminfo --machinereadable`
/// output. Lines without `=` are ignored; surrounding quotes are stripped.
pub fn parse_machine_readable(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            (
                key.trim().trim_matches('"').to_string(),
                value.trim().trim_matches('"').to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_state_mapping() {
        assert_eq!(MachineStatus::from_vm_state("poweroff").unwrap(), MachineStatus::Stopped);
        assert_eq!(MachineStatus::from_vm_state("running").unwrap(), MachineStatus::Running);
        assert_eq!(MachineStatus::from_vm_state("paused").unwrap(), MachineStatus::Paused);
        assert_eq!(MachineStatus::from_vm_state("aborted").unwrap(), MachineStatus::Aborted);

        let err = MachineStatus::from_vm_state("saved").unwrap_err();
        assert!(matches!(err, HarkError::UnrecognisedMachineState(ref s) if s == "saved"));
    }

    #[test]
    fn test_parse_machine_readable() {
        let output = "name=\"hark-vm\"\nVMState=\"poweroff\"\nmemory=1024\n\"storage-0-0\"=\"/x/y.vmdk\"\ngarbage line\n";
        let info = parse_machine_readable(output);
        assert_eq!(info["name"], "hark-vm");
        assert_eq!(info["VMState"], "poweroff");
        assert_eq!(info["memory"], "1024");
        assert_eq!(info["storage-0-0"], "/x/y.vmdk");
        assert_eq!(info.len(), 4);
    }
}
