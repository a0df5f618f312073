//! Host-to-container file sync
//!
//! Sessions are owned by the sync daemon and identified by the label
//! `<app>-sync=<env-name>`. Nothing is persisted on our side: whether a
//! session must be recreated is decided from the daemon's own listing, which
//! records the container id the session was created against.

pub mod mutagen;

use crate::config::Params;
use crate::product::ProductConfig;
use crate::project::Project;
use crate::runtime::ContainerRuntime;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

pub use mutagen::Mutagen;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What the sync daemon needs to create a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub label: String,
    pub config_file: PathBuf,
    pub ignore: Vec<String>,
    /// Host endpoint
    pub alpha: String,
    /// Container endpoint (`docker://<id><path>`)
    pub beta: String,
}

/// Operations the supervisor needs from the sync daemon
#[allow(async_fn_in_trait)]
pub trait SyncTool {
    async fn version(&self) -> Result<String>;
    async fn create(&self, spec: &SessionSpec) -> Result<()>;
    /// Human-readable listing of sessions matching `label`
    async fn list(&self, label: &str) -> Result<String>;
    async fn terminate(&self, label: &str) -> Result<()>;
    async fn pause(&self, label: &str) -> Result<()>;
    async fn resume(&self, label: &str) -> Result<()>;
    async fn flush(&self, label: &str) -> Result<()>;
    async fn reset(&self, label: &str) -> Result<()>;
    async fn monitor(&self, label: &str) -> Result<()>;
}

/// Where a project's files are synced to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub label: String,
    /// Labels identifying the primary container
    pub container_labels: Vec<String>,
    /// Path inside the container
    pub path: String,
    /// Host path (`<cwd><webroot>`)
    pub local_path: String,
    pub config_file: PathBuf,
    pub ignore: Vec<String>,
}

impl SyncTarget {
    pub fn for_project<C: ProductConfig>(config: &C, project: &Project, params: &Params) -> Self {
        let name = config.name();
        let env_name = project.name.as_str();
        let service = params.get_string(&config.key("sync_container"));
        let ignore = params
            .get_string(&config.key("sync_ignore"))
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            label: format!("{}-sync={}", name, env_name),
            container_labels: vec![
                format!("dev.{}.container.name={}", name, service),
                format!("dev.{}.environment.name={}", name, env_name),
            ],
            path: params.get_string(&config.key("sync_path")),
            local_path: format!(
                "{}{}",
                project.dir.display(),
                project.web_root(config, params)
            ),
            config_file: project
                .dir
                .join(config.project_dir_name())
                .join("mutagen.yml"),
            ignore,
        }
    }
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"URL: docker://([^/\s]+)").expect("static url pattern"))
}

/// Container id recorded in a session listing
pub fn listed_container_id(listing: &str) -> Option<String> {
    url_pattern()
        .captures(listing)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Sync reaction to a composition command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `up` / `start`: resume a healthy session, otherwise recreate it
    Start,
    /// `stop`
    Pause,
    /// `down`
    Terminate,
}

impl Transition {
    /// Transition implied by composition arguments, if any
    ///
    /// Commands passing arguments through to a container (`--`) are left
    /// alone.
    pub fn for_args(args: &[String]) -> Option<Self> {
        if args.iter().any(|a| a == "--") {
            return None;
        }
        match args.iter().find(|a| !a.starts_with('-'))?.as_str() {
            "up" | "start" => Some(Transition::Start),
            "stop" => Some(Transition::Pause),
            "down" => Some(Transition::Terminate),
            _ => None,
        }
    }
}

/// Keeps the project's sync session aligned with the primary container
pub struct Supervisor<'a, R, S> {
    runtime: &'a R,
    tool: &'a S,
    poll_interval: Duration,
}

impl<'a, R: ContainerRuntime, S: SyncTool> Supervisor<'a, R, S> {
    pub fn new(runtime: &'a R, tool: &'a S) -> Self {
        Self {
            runtime,
            tool,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether the session must be recreated
    ///
    /// True when the container is gone or not running, when there is no
    /// session, or when the session points at another container.
    pub async fn container_changed(&self, target: &SyncTarget) -> bool {
        let id = match self.runtime.container_id_by_label(&target.container_labels).await {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %format!("{:#}", e), "sync container lookup failed");
                return true;
            }
        };
        match self.runtime.container_state(&id).await {
            Ok(state) if state == "running" => {}
            other => {
                debug!(?other, "sync container not running");
                return true;
            }
        }
        let listing = match self.tool.list(&target.label).await {
            Ok(listing) => listing,
            Err(e) => {
                debug!(error = %format!("{:#}", e), "sync list failed");
                return true;
            }
        };
        match listed_container_id(&listing) {
            Some(listed) => {
                debug!(%listed, current = %id, "sync container");
                listed != id
            }
            None => true,
        }
    }

    /// Recreate the session and wait until it is watching for changes
    pub async fn start(&self, target: &SyncTarget) -> Result<()> {
        if let Err(e) = self.tool.terminate(&target.label).await {
            debug!(error = %format!("{:#}", e), "no previous sync session");
        }

        let id = self
            .runtime
            .container_id_by_label(&target.container_labels)
            .await
            .context("resolving the sync container")?;

        eprintln!("{}", "Creating mutagen sync session...".cyan());
        let spec = SessionSpec {
            label: target.label.clone(),
            config_file: target.config_file.clone(),
            ignore: target.ignore.clone(),
            alpha: target.local_path.clone(),
            beta: format!("docker://{}{}", id, target.path),
        };
        self.tool
            .create(&spec)
            .await
            .context("creating the sync session")?;

        eprintln!(
            "{}",
            "Waiting for initial synchronization to complete...".cyan()
        );
        self.wait_ready(&target.label).await
    }

    /// Poll the session listing until it watches for changes or reports an error
    pub async fn wait_ready(&self, label: &str) -> Result<()> {
        loop {
            let listing = self.tool.list(label).await?;
            for line in listing.lines() {
                let lower = line.to_lowercase();
                if lower.contains("last error") {
                    bail!("sync session {} failed: {}", label, line.trim());
                }
                if lower.contains("watching for changes") {
                    debug!(label, "sync session ready");
                    return Ok(());
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn apply(&self, transition: Transition, target: &SyncTarget) -> Result<()> {
        match transition {
            Transition::Start => {
                if self.container_changed(target).await {
                    self.start(target).await
                } else {
                    debug!(label = %target.label, "resuming sync session");
                    self.tool.resume(&target.label).await
                }
            }
            Transition::Pause => {
                eprintln!("{}", "Pausing mutagen sync session...".cyan());
                self.tool.pause(&target.label).await
            }
            Transition::Terminate => {
                eprintln!("{}", "Stopping mutagen sync session...".cyan());
                self.tool.terminate(&target.label).await
            }
        }
    }
}
