//! Sync session control and sync daemon bootstrap

use super::Orchestrator;
use crate::product::ProductConfig;
use crate::runtime::tool::{mutagen_tool, InstallMethod};
use crate::runtime::{require_min, ComposeRunner, ContainerRuntime};
use crate::sync::{Supervisor, SyncTarget, SyncTool};
use crate::templates;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    Start,
    Stop,
    Pause,
    Resume,
    List,
    Flush,
    Monitor,
    Reset,
}

impl SyncCommand {
    pub const ALL: [SyncCommand; 8] = [
        SyncCommand::Start,
        SyncCommand::Stop,
        SyncCommand::Pause,
        SyncCommand::Resume,
        SyncCommand::List,
        SyncCommand::Flush,
        SyncCommand::Monitor,
        SyncCommand::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncCommand::Start => "start",
            SyncCommand::Stop => "stop",
            SyncCommand::Pause => "pause",
            SyncCommand::Resume => "resume",
            SyncCommand::List => "list",
            SyncCommand::Flush => "flush",
            SyncCommand::Monitor => "monitor",
            SyncCommand::Reset => "reset",
        }
    }
}

impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SyncCommand::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .with_context(|| {
                format!(
                    "unknown sync command '{}' (expected one of: {})",
                    s,
                    SyncCommand::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

impl<C, R, D, S> Orchestrator<C, R, D, S>
where
    C: ProductConfig,
    R: ContainerRuntime,
    D: ComposeRunner,
    S: SyncTool,
{
    /// Control the project's sync session directly
    pub async fn sync(&mut self, command: SyncCommand) -> Result<()> {
        let project = self.project()?;
        if !self.params.get_bool(&self.config.key("sync_enabled")) {
            eprintln!(
                "{}",
                format!("File sync is not used on {}.", self.host.os).yellow()
            );
            return Ok(());
        }

        let target = SyncTarget::for_project(&self.config, &project, &self.params);
        let label = target.label.as_str();
        match command {
            SyncCommand::Start => {
                self.ensure_sync_tool().await?;
                templates::generate_mutagen_config(
                    &self.registry(),
                    &self.params,
                    project.env_type,
                    self.host.os,
                    &target.config_file,
                )?;
                Supervisor::new(&self.runtime, &self.sync)
                    .with_poll_interval(self.poll_interval)
                    .start(&target)
                    .await
            }
            SyncCommand::Stop => self.sync.terminate(label).await,
            SyncCommand::Pause => self.sync.pause(label).await,
            SyncCommand::Resume => self.sync.resume(label).await,
            SyncCommand::Flush => self.sync.flush(label).await,
            SyncCommand::Reset => self.sync.reset(label).await,
            SyncCommand::Monitor => self.sync.monitor(label).await,
            SyncCommand::List => {
                print!("{}", self.sync.list(label).await?);
                Ok(())
            }
        }
    }

    /// Check the sync daemon version, offering to install it when missing
    pub async fn ensure_sync_tool(&self) -> Result<()> {
        let required = self.params.get_string(&self.config.key("mutagen_required_version"));

        let error = match self.sync.version().await {
            Ok(version) => return require_min("mutagen", &version, &required),
            Err(e) => e,
        };
        debug!(error = %format!("{:#}", error), "mutagen version check failed");

        let url = self.params.get_string(&self.config.key("mutagen_url"));
        let tool = mutagen_tool(&self.config, &url);
        if tool.is_installed() {
            return Err(error.context("mutagen is installed but not working"));
        }

        let method = InstallMethod::for_os(self.host.os);
        if method == InstallMethod::Manual {
            bail!("mutagen is required: {}", tool.install_command(&method));
        }
        let question = format!(
            "Mutagen is required for file sync. Install it ({})?",
            tool.install_command(&method)
        );
        if !self.ask(&question)? {
            bail!("mutagen is required for file sync on {}", self.host.os);
        }

        tool.install(&method).await?;
        let version = self
            .sync
            .version()
            .await
            .context("mutagen is still not available after installation")?;
        require_min("mutagen", &version, &required)?;
        eprintln!("{}", format!("Mutagen {} installed.", version).green());
        Ok(())
    }
}
