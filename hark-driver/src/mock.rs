//! Test doubles: a command runner that records instead of executing, and a
//! driver whose status is scripted.

// Standard library
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

// External crates
use async_trait::async_trait;

// Internal imports
use hark_core::command::{Command, CommandOutput, CommandRunner};
use hark_core::error::{HarkError, Result};
use hark_store::{DriverKind, Machine, PortMapping, Store};

use crate::{Driver, DriverFactory, MachineStatus};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Rule {
    pattern: String,
    exit_status: i32,
    stdout: String,
    stderr: String,
}

/// Records every command and answers from a list of canned responses.
///
/// The first rule whose pattern is a substring of the command line wins;
/// unmatched commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Command>>,
    rules: Mutex<Vec<Rule>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, pattern: &str, exit_status: i32, stdout: &str, stderr: &str) {
        lock(&self.rules).push(Rule {
            pattern: pattern.to_string(),
            exit_status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<Command> {
        lock(&self.calls).clone()
    }

    /// Recorded commands rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        lock(&self.calls).iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &Command) -> Result<CommandOutput> {
        lock(&self.calls).push(command.clone());
        let line = command.to_string();

        let rules = lock(&self.rules);
        let output = match rules.iter().find(|rule| line.contains(&rule.pattern)) {
            Some(rule) => CommandOutput {
                command: line,
                exit_status: rule.exit_status,
                stdout: rule.stdout.clone(),
                stderr: rule.stderr.clone(),
            },
            None => CommandOutput {
                command: line,
                exit_status: 0,
                stdout: String::new(),
                stderr: String::new(),
            },
        };
        Ok(output)
    }
}

/// State shared by a [`MockDriverFactory`] and every driver it hands out.
#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<String>>,
    statuses: Mutex<VecDeque<MachineStatus>>,
    fail_create: Mutex<bool>,
    unregistered: Mutex<bool>,
}

/// Hands out [`MockDriver`]s that all record into the same call log.
#[derive(Clone, Default)]
pub struct MockDriverFactory {
    state: Arc<MockState>,
}

impl MockDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses reported by successive `status()` calls. The last one
    /// repeats; with none scripted the machine reports stopped.
    pub fn with_statuses(self, statuses: &[MachineStatus]) -> Self {
        *lock(&self.state.statuses) = statuses.iter().copied().collect();
        self
    }

    /// Make `create()` fail as if the hypervisor tool had.
    pub fn failing_create(self) -> Self {
        *lock(&self.state.fail_create) = true;
        self
    }

    /// Report every machine as unknown to the hypervisor.
    pub fn unregistered(self) -> Self {
        *lock(&self.state.unregistered) = true;
        self
    }

    /// Every driver call so far, as `"{operation} {machine name}"`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state.calls).clone()
    }
}

impl DriverFactory for MockDriverFactory {
    fn driver_for(&self, machine: &Machine) -> Result<Box<dyn Driver>> {
        Ok(Box::new(MockDriver {
            machine: machine.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct MockDriver {
    machine: Machine,
    state: Arc<MockState>,
}

impl MockDriver {
    fn record(&self, operation: &str) {
        lock(&self.state.calls).push(format!("{} {}", operation, self.machine.name));
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn kind(&self) -> DriverKind {
        self.machine.driver
    }

    fn machine(&self) -> &Machine {
        &self.machine
    }

    async fn status(&self) -> Result<MachineStatus> {
        self.record("status");
        if *lock(&self.state.unregistered) {
            return Err(HarkError::MachineNotFound(self.machine.name.clone()));
        }
        let mut statuses = lock(&self.state.statuses);
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(status.unwrap_or(MachineStatus::Stopped))
    }

    async fn create(&self, _base_image: &Path, _store: &Store) -> Result<()> {
        self.record("create");
        if *lock(&self.state.fail_create) {
            return Err(HarkError::CommandFailed {
                command: format!("mock createvm {}", self.machine.name),
                exit_status: 1,
                stderr: "mock failure".to_string(),
            });
        }
        Ok(())
    }

    async fn start(&self, gui: bool) -> Result<()> {
        self.record(if gui { "start-gui" } else { "start" });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop");
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.record("destroy");
        Ok(())
    }

    async fn set_port_mappings(&self, mappings: &[PortMapping]) -> Result<()> {
        for mapping in mappings {
            self.record(&format!("map {}:{}", mapping.host_port, mapping.guest_port));
        }
        Ok(())
    }
}
