//! Mutagen driver

use super::{SessionSpec, SyncTool};
use crate::error::EnvError;
use crate::runtime::{capture, CommandOutput};
use anyhow::{Context, Result};
use tokio::process::Command;

/// `mutagen` CLI driver
#[derive(Debug, Clone)]
pub struct Mutagen {
    program: String,
}

impl Default for Mutagen {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutagen {
    pub fn new() -> Self {
        Self {
            program: "mutagen".to_string(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = capture(&self.program, args).await?;
        if !output.success() {
            return Err(anyhow::Error::new(EnvError::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                code: output.code,
            })
            .context(format!("mutagen: {}", output.stderr.trim())));
        }
        Ok(output)
    }

    async fn label_command(&self, verb: &str, label: &str) -> Result<()> {
        self.run(&["sync", verb, "--label-selector", label]).await?;
        Ok(())
    }
}

/// Arguments for `mutagen sync create`
pub fn create_args(spec: &SessionSpec) -> Vec<String> {
    let mut args = vec![
        "sync".to_string(),
        "create".to_string(),
        "-c".to_string(),
        spec.config_file.display().to_string(),
        "--label".to_string(),
        spec.label.clone(),
    ];
    for pattern in &spec.ignore {
        args.push("--ignore".to_string());
        args.push(pattern.clone());
    }
    args.push(spec.alpha.clone());
    args.push(spec.beta.clone());
    args
}

impl SyncTool for Mutagen {
    async fn version(&self) -> Result<String> {
        let output = self.run(&["version"]).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn create(&self, spec: &SessionSpec) -> Result<()> {
        let args = create_args(spec);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args).await?;
        Ok(())
    }

    async fn list(&self, label: &str) -> Result<String> {
        let output = self
            .run(&["sync", "list", "--label-selector", label])
            .await?;
        Ok(output.stdout)
    }

    async fn terminate(&self, label: &str) -> Result<()> {
        self.label_command("terminate", label).await
    }

    async fn pause(&self, label: &str) -> Result<()> {
        self.label_command("pause", label).await
    }

    async fn resume(&self, label: &str) -> Result<()> {
        self.label_command("resume", label).await
    }

    async fn flush(&self, label: &str) -> Result<()> {
        self.label_command("flush", label).await
    }

    async fn reset(&self, label: &str) -> Result<()> {
        self.label_command("reset", label).await
    }

    async fn monitor(&self, label: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(["sync", "monitor", "--label-selector", label])
            .status()
            .await
            .context("Failed to run mutagen")?;
        if !status.success() {
            return Err(EnvError::CommandFailed {
                command: format!("{} sync monitor", self.program),
                code: status.code(),
            }
            .into());
        }
        Ok(())
    }
}
