//! Recording [`CommandRunner`] for tests.
//!
//! Queries answer from a table keyed by the full command line; anything not in
//! the table fails like a missing package would. Streaming commands succeed
//! unless their command line starts with a registered failure prefix.

use crate::command_runner::{CommandRunner, display_command};
use crate::error::{CudaInstallError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FakeRunner {
    responses: HashMap<String, std::result::Result<String, String>>,
    failing_runs: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the query `command` with `response`
    pub fn respond(
        mut self,
        command: &str,
        response: std::result::Result<&str, &str>,
    ) -> Self {
        let response = response.map(str::to_string).map_err(str::to_string);
        self.responses.insert(command.to_string(), response);
        self
    }

    /// Make streaming commands starting with `prefix` exit non-zero
    pub fn fail_run(mut self, prefix: &str) -> Self {
        self.failing_runs.push(prefix.to_string());
        self
    }

    /// Every command line seen so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded commands starting with `prefix`
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn was_run(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }

    fn record(&self, command: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.to_string());
        }
    }

    fn stream(&self, command: String) -> Result<()> {
        self.record(&command);
        if self.failing_runs.iter().any(|p| command.starts_with(p.as_str())) {
            return Err(CudaInstallError::command(command, "exit code 1"));
        }
        Ok(())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        self.stream(display_command(program, args))
    }

    fn run_shell(&self, command_line: &str) -> Result<()> {
        self.stream(command_line.to_string())
    }

    fn query(&self, program: &str, args: &[&str]) -> Result<String> {
        let command = display_command(program, args);
        self.record(&command);
        match self.responses.get(&command) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(reason)) => Err(CudaInstallError::command(command, reason.clone())),
            None => Err(CudaInstallError::command(command, "exit code 1")),
        }
    }
}
