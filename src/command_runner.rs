//! External command execution.
//!
//! Every `pacman`, `curl` and `bash` invocation goes through [`CommandRunner`],
//! so the pipeline can be exercised in tests with a fake runner and so every
//! spawned child is registered with the process guard.
//!
//! Two execution styles exist:
//!
//! - **Streaming** (`run`, `run_shell`): stdio is inherited from the terminal,
//!   the operator sees pacman prompts and curl progress. A non-zero exit is an
//!   error.
//! - **Query** (`query`): stdout and stderr are captured and returned as text.
//!   A non-zero exit is an error; callers decide whether that matters.

use crate::error::{CudaInstallError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use tracing::{debug, info, warn};

/// Runs external programs on behalf of the installer
pub trait CommandRunner: Sync {
    /// Run `program` with `args`, streaming its stdio to the terminal.
    fn run(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Run a command line through `bash -c`, streaming its stdio.
    fn run_shell(&self, command_line: &str) -> Result<()>;

    /// Run `program` with `args` and return stdout followed by stderr.
    fn query(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Human-readable form of an argv vector for logs and errors
pub fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    /// Print streaming commands instead of executing them; queries still run
    dry_run: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that only prints the commands that would change the system
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn stream(&self, mut cmd: Command, shown: &str) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Skipped: {}", shown);
            println!("[DRY RUN] Would run: {}", shown);
            return Ok(());
        }

        info!("Running {}", shown);
        // Streaming commands may prompt (sudo, pacman), so they stay in our
        // process group and keep the terminal
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .with_parent_death_signal();

        let child = cmd
            .spawn()
            .map_err(|e| CudaInstallError::command(shown, format!("failed to spawn: {}", e)))?;
        let status = wait_registered(child, |mut child| child.wait())
            .map_err(|e| CudaInstallError::command(shown, format!("failed to wait: {}", e)))?;

        check_status(shown, status)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        self.stream(cmd, &display_command(program, args))
    }

    fn run_shell(&self, command_line: &str) -> Result<()> {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command_line);
        self.stream(cmd, command_line)
    }

    fn query(&self, program: &str, args: &[&str]) -> Result<String> {
        let shown = display_command(program, args);
        debug!("Querying {}", shown);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .map_err(|e| CudaInstallError::command(&shown, format!("failed to spawn: {}", e)))?;

        let output: Output = wait_registered(child, |child| child.wait_with_output())
            .map_err(|e| CudaInstallError::command(&shown, format!("failed to wait: {}", e)))?;

        check_status(&shown, output.status)?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }
}

/// Track `child` in the global registry for as long as `wait` blocks
fn wait_registered<T>(
    child: Child,
    wait: impl FnOnce(Child) -> std::io::Result<T>,
) -> std::io::Result<T> {
    let pid = child.id();
    let registry = ChildRegistry::global();
    if let Ok(mut guard) = registry.lock() {
        guard.register(pid);
    }

    let result = wait(child);

    if let Ok(mut guard) = registry.lock() {
        guard.unregister(pid);
    }
    result
}

fn check_status(shown: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        debug!("{} exited successfully", shown);
        return Ok(());
    }

    let reason = match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    warn!("{} failed: {}", shown, reason);
    Err(CudaInstallError::command(shown, reason))
}
