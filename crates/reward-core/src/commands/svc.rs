//! Shared infrastructure composition

use super::{verb, Orchestrator};
use crate::error::EnvError;
use crate::peered::{self, PeerAction};
use crate::plan::{inject_detach, ConfigSet, Plan};
use crate::product::ProductConfig;
use crate::project::{Project, ProjectDomain};
use crate::runtime::{check_compose, check_docker, ComposeRunner, ContainerRuntime, IoMode};
use crate::sync::SyncTool;
use crate::templates::{self, render, TemplateSet, SERVICES_TEMPLATE};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

impl<C, R, D, S> Orchestrator<C, R, D, S>
where
    C: ProductConfig,
    R: ContainerRuntime,
    D: ComposeRunner,
    S: SyncTool,
{
    /// Run a composition command against the shared services
    pub async fn svc(&mut self, args: &[String]) -> Result<()> {
        check_docker(&self.runtime).await?;
        check_compose(&self.compose).await?;

        if args.is_empty() {
            let plan = self.build_svc_plan()?;
            self.run_compose(&plan, &["--help".to_string()], IoMode::Filtered(self.output_filter()))
                .await?;
            return Ok(());
        }

        let verb = verb(args).unwrap_or_default().to_string();
        let mut args = args.to_vec();

        if matches!(verb.as_str(), "up" | "restart") {
            self.write_traefik_config()?;
        }
        if verb == "up" {
            args = inject_detach(&args);
        }

        let plan = self.build_svc_plan()?;
        self.run_compose(&plan, &args, IoMode::Filtered(self.output_filter()))
            .await?;

        if verb == "up" {
            self.connect_project_networks().await?;
        }
        Ok(())
    }

    fn ssl_dir(&self) -> PathBuf {
        PathBuf::from(self.params.get_string(&self.config.key("ssl_dir")))
    }

    fn write_traefik_config(&self) -> Result<()> {
        let ssl_dir = self.ssl_dir();
        let ca = ssl_dir.join("rootca/certs/ca.cert.pem");
        if !ca.exists() {
            return Err(anyhow::Error::new(EnvError::FileNotFound(ca)).context(format!(
                "the root certificate is missing; run `{} install` first",
                self.config.name()
            )));
        }

        let registry = self.registry();
        templates::generate_traefik_config(&registry, &self.params, &self.app_home)?;
        templates::generate_traefik_dynamic_config(
            &self.app_home,
            &ssl_dir,
            &self.params.get_string(&self.config.key("service_domain")),
        )?;
        Ok(())
    }

    fn build_svc_plan(&self) -> Result<Plan> {
        let mut set = TemplateSet::new();
        set.append_from(&self.registry(), &[SERVICES_TEMPLATE.to_string()])?;
        if set.is_empty() {
            return Err(EnvError::FileNotFound(PathBuf::from(SERVICES_TEMPLATE)).into());
        }
        let rendered = set.render_all(&render::context(&self.params)?)?;
        ConfigSet::parse(&rendered)?.materialize(&self.temp, &self.app_home, self.config.name())
    }

    /// Attach the roster to every project network
    ///
    /// Traefik only gets DNS aliases on the network of the project in the
    /// working directory, the only one whose domain is known here.
    async fn connect_project_networks(&self) -> Result<()> {
        let label = format!("dev.{}.environment.name", self.config.name());
        let networks = self
            .runtime
            .networks_by_label(&label)
            .await
            .context("listing project networks")?;

        let current = Project::from_params(&self.config, &self.params, &self.cwd)
            .ok()
            .map(|p| p.network_name());
        let domain = ProjectDomain::from_params(&self.params);

        for network in networks {
            let with_domain = current.as_deref() == Some(network.name.as_str());
            let roster = peered::roster(&self.config, &self.params, with_domain.then_some(&domain));
            let outcomes = peered::apply(&self.runtime, PeerAction::Connect, &network.name, &roster).await;
            debug!(network = %network.name, attached = outcomes.iter().filter(|o| o.is_ok()).count(), "peered services");
        }
        Ok(())
    }
}
