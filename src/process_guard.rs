//! Process lifecycle management for child processes
//!
//! An interrupted install must not leave `curl` downloads running in the
//! background or a half-filled download directory behind.
//!
//! # Solution
//! - Spawn capture-only children in their own process group with a parent
//!   death signal, so they die with us
//! - Track all child PIDs and work directories in a global registry
//! - On SIGINT/SIGTERM/SIGHUP, send SIGTERM to all children, SIGKILL after a
//!   grace period, then remove every registered work directory

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Global registry of child processes and directories to clean up
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking spawned child processes and temporary directories
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// Child PIDs currently running
    pids: HashSet<u32>,
    /// Directories removed after children are terminated
    cleanup_dirs: HashSet<PathBuf>,
    /// Set once teardown has run, so a second signal is a no-op
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Register a new child process
    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered child process PID {}", pid);
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered child process PID {}", pid);
    }

    /// Remove `dir` on interrupt
    pub fn register_dir(&mut self, dir: &Path) {
        self.cleanup_dirs.insert(dir.to_path_buf());
    }

    /// Stop tracking `dir` (its owner removed it already)
    pub fn unregister_dir(&mut self, dir: &Path) {
        self.cleanup_dirs.remove(dir);
    }

    /// Number of tracked children
    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Number of tracked directories
    pub fn dir_count(&self) -> usize {
        self.cleanup_dirs.len()
    }

    /// Terminate all tracked children, then remove tracked directories.
    ///
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn teardown(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("Teardown already ran, skipping");
            return;
        }
        self.cleanup_initiated = true;

        self.terminate_children(grace_period);

        for dir in self.cleanup_dirs.drain() {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => tracing::info!("Removed {}", dir.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Failed to remove {}: {} (remove it manually)",
                    dir.display(),
                    e
                ),
            }
        }
    }

    fn terminate_children(&mut self, grace_period: Duration) {
        if self.pids.is_empty() {
            tracing::debug!("No child processes to terminate");
            return;
        }

        tracing::info!("Terminating {} child process(es)...", self.pids.len());

        let pids: Vec<u32> = self.pids.drain().collect();
        for &pid in &pids {
            // Group first so curl's own children go too; interactive children
            // share our group and only get the direct signal
            if send_signal_to_group(pid, Signal::SIGTERM).is_err() {
                if let Err(e) = send_signal(pid, Signal::SIGTERM) {
                    tracing::warn!("Failed to send SIGTERM to PID {}: {}", pid, e);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if !pids.iter().any(|&pid| is_process_alive(pid)) {
                tracing::info!("All child processes terminated");
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids.iter().filter(|&&pid| is_process_alive(pid)) {
            tracing::warn!("PID {} ignored SIGTERM, sending SIGKILL", pid);
            if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                let _ = send_signal(pid, Signal::SIGKILL);
            }
        }
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID addresses the whole process group led by `pgid`
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process is still running (zombies count as dead)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/<pid>/stat is the state letter
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        if let Some(state) = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
        {
            return !matches!(state, "Z" | "X");
        }
    }

    true
}

/// Install handlers for SIGINT (Ctrl+C), SIGTERM and SIGHUP.
///
/// The handler thread tears down the global registry and exits with
/// `128 + signal`. Call this once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };

            tracing::error!("Installation interrupted ({}), cleaning up...", signal_name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.teardown(Duration::from_secs(3));
            }

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command to tie children to our lifetime
pub trait CommandProcessGroup {
    /// Run the command in its own process group and kill it if we die.
    ///
    /// Only for commands that never read the terminal: a background process
    /// group cannot prompt for a sudo password.
    fn in_new_process_group(&mut self) -> &mut Self;

    /// Kill the command if we die, keeping it in the foreground process group
    fn with_parent_death_signal(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only makes async-signal-safe syscalls
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;
                set_parent_death_signal()
            });
        }
        self
    }

    fn with_parent_death_signal(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe
        unsafe {
            self.pre_exec(set_parent_death_signal);
        }
        self
    }
}

fn set_parent_death_signal() -> std::io::Result<()> {
    // SAFETY: PR_SET_PDEATHSIG takes a plain signal number
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) } == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
