//! Command flows
//!
//! `Orchestrator` owns the resolved parameters and the three external tool
//! drivers, and sequences the components for each subcommand:
//!
//! - `env`: project composition with peered networks and file sync
//! - `svc`: shared infrastructure composition
//! - `shell`, `debug`, `db`, `blackfire`: exec shortcuts
//! - `sync`: direct sync session control
//! - `env-init`: project initialisation

pub mod env;
pub mod exec;
pub mod init;
pub mod svc;
pub mod sync;

use crate::config::{derive, loader, HostInfo, Params};
use crate::plan::{ConfigSet, OutputFilter, Plan, TempFiles};
use crate::product::ProductConfig;
use crate::project::Project;
use crate::runtime::{ComposeRunner, ContainerRuntime, IoMode};
use crate::sync::{SyncTool, DEFAULT_POLL_INTERVAL};
use crate::templates::{self, render, select, TemplateRegistry};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Yes/no question asked before disruptive steps
pub type Prompter = fn(&str) -> Result<bool>;

/// Declines every question
pub fn decline(_question: &str) -> Result<bool> {
    Ok(false)
}

pub struct Orchestrator<C, R, D, S> {
    pub config: C,
    pub params: Params,
    pub host: HostInfo,
    pub cwd: PathBuf,
    pub app_home: PathBuf,
    pub runtime: R,
    pub compose: D,
    pub sync: S,
    pub temp: Arc<TempFiles>,
    prompter: Prompter,
    poll_interval: Duration,
    project: Option<Project>,
}

impl<C, R, D, S> Orchestrator<C, R, D, S>
where
    C: ProductConfig,
    R: ContainerRuntime,
    D: ComposeRunner,
    S: SyncTool,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: C,
        params: Params,
        host: HostInfo,
        cwd: PathBuf,
        runtime: R,
        compose: D,
        sync: S,
        temp: Arc<TempFiles>,
    ) -> Self {
        let app_home = loader::app_home(&config, &params);
        let poll_interval = params
            .get_u64(&config.key("sync_poll_interval"))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        Self {
            config,
            params,
            host,
            cwd,
            app_home,
            runtime,
            compose,
            sync,
            temp,
            prompter: decline,
            poll_interval,
            project: None,
        }
    }

    pub fn with_prompter(mut self, prompter: Prompter) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn registry(&self) -> TemplateRegistry {
        TemplateRegistry::new(
            &self.cwd.join(self.config.project_dir_name()),
            &self.app_home,
        )
    }

    /// The current project, with its env-type derivations applied once
    pub fn project(&mut self) -> Result<Project> {
        if let Some(project) = &self.project {
            return Ok(project.clone());
        }
        let project = Project::from_params(&self.config, &self.params, &self.cwd)?;
        derive(&self.config, &mut self.params, project.env_type, &self.host);
        debug!(name = %project.name, env_type = %project.env_type, "project loaded");
        self.project = Some(project.clone());
        Ok(project)
    }

    /// Select, render and materialize the project's fragments
    pub fn build_plan(&self, project: &Project) -> Result<Plan> {
        let fragments = select(&self.config, project.env_type, &self.params, self.host.os);
        debug!(fragments = ?fragments.iter().map(|f| f.name()).collect::<Vec<_>>(), "selected");

        let set = templates::build_environment_set(
            &self.registry(),
            &fragments,
            project.env_type,
            self.host.os,
        )?;
        let rendered = set.render_all(&render::context(&self.params)?)?;
        let configs = ConfigSet::parse(&rendered)?;
        configs.materialize(&self.temp, &self.cwd, project.name.as_str())
    }

    fn output_filter(&self) -> OutputFilter {
        OutputFilter::new(self.config.compose_verb())
    }

    async fn run_compose(&self, plan: &Plan, args: &[String], mode: IoMode) -> Result<String> {
        self.compose.run(&plan.argv(args), mode).await
    }

    fn ask(&self, question: &str) -> Result<bool> {
        (self.prompter)(question)
    }
}

/// First argument that is not a flag
pub(crate) fn verb(args: &[String]) -> Option<&str> {
    args.iter().map(String::as_str).find(|a| !a.starts_with('-'))
}
