//! External tool drivers and host checks
//!
//! This module provides:
//! - The container runtime seam (`ContainerRuntime`, driven by the docker CLI)
//! - The composition tool seam (`ComposeRunner`, driven by `docker compose`)
//! - Version gates and the superuser guard
//! - Sync daemon installation (`ToolManager`)

pub mod check;
pub mod compose;
pub mod docker;
pub mod tool;

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::trace;

pub use check::{check_compose, check_docker, check_superuser, parse_version, require_min};
pub use compose::{ComposeRunner, DockerCompose, IoMode};
pub use docker::{ContainerRuntime, ContainerSummary, DockerCli, NetworkSummary};
pub use tool::ToolManager;

/// Output of a captured subprocess
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `program args...` with no stdin and collect its output
pub async fn capture<S: AsRef<str>>(program: &str, args: &[S]) -> Result<CommandOutput> {
    let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    trace!(program, ?args, "running");

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run {}", program))?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
