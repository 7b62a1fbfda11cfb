// Standard library
use std::fmt;
use std::path::PathBuf;

// External crates
use async_trait::async_trait;
use duct::cmd;
use futures_util::future::join_all;
use tracing::debug;

// Internal imports
use crate::error::{HarkError, Result};

/// An external program invocation: program name, argument list and stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    stdin: String,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: String::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Run the command on the current thread, capturing stdout and stderr.
    ///
    /// A non-zero exit status is *not* an error here; see
    /// [`CommandOutput::into_result`].
    pub fn run_blocking(&self) -> Result<CommandOutput> {
        debug!("Running command: {}", self);
        let output = cmd(self.program.as_str(), &self.args)
            .stdin_bytes(self.stdin.as_bytes().to_vec())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        Ok(CommandOutput {
            command: self.to_string(),
            exit_status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command. Output is decoded as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Turn a non-zero exit status into [`HarkError::CommandFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(HarkError::CommandFailed {
                command: self.command,
                exit_status: self.exit_status,
                stderr: self.stderr,
            })
        }
    }
}

/// Executes external commands. Drivers talk to their hypervisor tool only
/// through this trait.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &Command) -> Result<CommandOutput>;

    /// Run a command and fail if its exit status is not 0.
    async fn assert_run(&self, command: &Command) -> Result<CommandOutput> {
        self.run(command).await?.into_result()
    }
}

/// Runs commands as real subprocesses on the blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &Command) -> Result<CommandOutput> {
        let command = command.clone();
        tokio::task::spawn_blocking(move || command.run_blocking())
            .await
            .map_err(|e| HarkError::Internal(format!("command task failed: {}", e)))?
    }
}

/// Run a batch of independent commands concurrently.
///
/// Results come back in submission order. Only use this for commands that do
/// not mutate the same machine.
pub async fn run_all(runner: &dyn CommandRunner, commands: &[Command]) -> Result<Vec<CommandOutput>> {
    let pending = commands.iter().map(|command| runner.run(command));
    join_all(pending).await.into_iter().collect()
}

/// Find the full path to a program on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let c = Command::new("VBoxManage").args(["showvminfo", "foo", "--machinereadable"]);
        assert_eq!(c.to_string(), "VBoxManage showvminfo foo --machinereadable");
    }

    #[test]
    fn test_run_blocking_captures_output() {
        let out = Command::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run_blocking()
            .expect("sh should run");
        assert_eq!(out.exit_status, 3);
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.success());
    }

    #[test]
    fn test_stdin_is_forwarded() {
        let out = Command::new("cat")
            .stdin("hello")
            .run_blocking()
            .expect("cat should run");
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn test_assert_run_fails_on_non_zero() {
        let err = SystemRunner
            .assert_run(&Command::new("sh").args(["-c", "echo nope >&2; exit 2"]))
            .await
            .unwrap_err();
        match err {
            HarkError::CommandFailed {
                exit_status, stderr, ..
            } => {
                assert_eq!(exit_status, 2);
                assert_eq!(stderr.trim(), "nope");
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_all_keeps_submission_order() {
        let commands = vec![
            Command::new("sh").args(["-c", "sleep 0.2; echo first"]),
            Command::new("echo").arg("second"),
        ];
        let results = run_all(&SystemRunner, &commands)
            .await
            .expect("commands should run");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].stdout.trim(), "first");
        assert_eq!(results[1].stdout.trim(), "second");
    }

    #[test]
    fn test_which_missing_program() {
        assert!(which("definitely-not-a-real-program-7f3a").is_none());
        assert!(which("sh").is_some());
    }
}
