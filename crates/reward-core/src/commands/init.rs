//! Project initialisation

use super::Orchestrator;
use crate::error::EnvError;
use crate::product::ProductConfig;
use crate::project::{seed, EnvName, EnvType};
use crate::runtime::{ComposeRunner, ContainerRuntime};
use crate::sync::SyncTool;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

impl<C, R, D, S> Orchestrator<C, R, D, S>
where
    C: ProductConfig,
    R: ContainerRuntime,
    D: ComposeRunner,
    S: SyncTool,
{
    /// Write the project env-file and override directory
    ///
    /// The env type falls back to `<APP>_ENV_TYPE` from the resolved
    /// parameters when not given.
    pub fn env_init(&self, name: Option<&str>, env_type: Option<&str>) -> Result<PathBuf> {
        let name = EnvName::parse(name.ok_or(EnvError::ArgumentRequired("environment name"))?)?;

        let fallback = self.params.get_string(&self.config.key("env_type"));
        let raw_type = match env_type {
            Some(t) => t.to_string(),
            None if !fallback.is_empty() => fallback,
            None => return Err(EnvError::ArgumentRequired("environment type").into()),
        };
        let env_type: EnvType = raw_type.parse()?;

        let prompter = self.prompter;
        let path = seed::init_env_file(&self.config, &self.cwd, &name, env_type, |path| {
            prompter(&format!("{} already exists. Overwrite?", path.display()))
        })?;

        eprintln!(
            "{} {} ({})",
            "Initialized".green(),
            name.as_str().bold(),
            env_type
        );
        Ok(path)
    }
}
