//! Composition tool invocation

use super::capture;
use crate::error::EnvError;
use crate::plan::{OutputFilter, SqlRewriter};
use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

/// How the composition tool's standard streams are wired
#[derive(Debug, Clone)]
pub enum IoMode {
    /// Inherit every stream (exec sessions, TTYs)
    Interactive,
    /// Pipe stdout through the output filter, inherit the rest
    Filtered(OutputFilter),
    /// Collect stdout and print nothing
    Captured,
    /// Feed host stdin through the SQL rewrite
    SqlImport(SqlRewriter),
}

/// Runs the composition tool with a prepared argument vector
#[allow(async_fn_in_trait)]
pub trait ComposeRunner {
    async fn version(&self) -> Result<String>;

    /// Run with `argv`; returns stdout in `Captured` mode, an empty string
    /// otherwise. A non-zero exit becomes `CommandFailed`.
    async fn run(&self, argv: &[String], mode: IoMode) -> Result<String>;
}

/// `docker compose` driver
#[derive(Debug, Clone)]
pub struct DockerCompose {
    program: String,
}

impl Default for DockerCompose {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCompose {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    fn command(&self, argv: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("compose").args(argv);
        cmd
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        Err(EnvError::CommandFailed {
            command: format!("{} compose", self.program),
            code: status.code(),
        }
        .into())
    }
}

impl ComposeRunner for DockerCompose {
    async fn version(&self) -> Result<String> {
        let output = capture(&self.program, &["compose", "version", "--short"]).await?;
        if !output.success() {
            anyhow::bail!("docker compose is not available: {}", output.stderr.trim());
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn run(&self, argv: &[String], mode: IoMode) -> Result<String> {
        trace!(?argv, ?mode, "docker compose");
        let mut cmd = self.command(argv);

        match mode {
            IoMode::Interactive => {
                let status = cmd
                    .status()
                    .await
                    .context("Failed to run docker compose")?;
                self.check(status)?;
                Ok(String::new())
            }
            IoMode::Captured => {
                let output = cmd
                    .stdin(Stdio::null())
                    .output()
                    .await
                    .context("Failed to run docker compose")?;
                if !output.status.success() {
                    debug!(stderr = %String::from_utf8_lossy(&output.stderr), "docker compose failed");
                }
                self.check(output.status)?;
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            IoMode::Filtered(filter) => {
                let mut child = cmd
                    .stdout(Stdio::piped())
                    .spawn()
                    .context("Failed to run docker compose")?;
                let stdout = child.stdout.take().context("Failed to capture stdout")?;

                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    if let Some(line) = filter.apply(&line) {
                        println!("{}", line);
                    }
                }

                let status = child.wait().await?;
                self.check(status)?;
                Ok(String::new())
            }
            IoMode::SqlImport(rewriter) => {
                let mut child = cmd
                    .stdin(Stdio::piped())
                    .spawn()
                    .context("Failed to run docker compose")?;
                let stdin = child.stdin.take().context("Failed to capture stdin")?;

                let pump =
                    tokio::spawn(async move { rewriter.pump(tokio::io::stdin(), stdin).await });

                let status = child.wait().await?;
                if !status.success() {
                    pump.abort();
                    return self.check(status).map(|_| String::new());
                }
                let lines = pump.await.context("SQL input task failed")??;
                debug!(lines, "import finished");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_prefixes_compose() {
        let cmd = DockerCompose::new().command(&["ps".to_string()]);
        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["compose", "ps"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_status_carries_code() {
        use std::os::unix::process::ExitStatusExt;

        let err = DockerCompose::new()
            .check(ExitStatus::from_raw(3 << 8))
            .unwrap_err();
        match err.downcast_ref::<EnvError>() {
            Some(EnvError::CommandFailed { code, .. }) => assert_eq!(*code, Some(3)),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
