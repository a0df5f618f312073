//! Project environment composition

use super::{verb, Orchestrator};
use crate::peered::{self, PeerAction};
use crate::plan::{inject_detach, inject_no_start};
use crate::product::ProductConfig;
use crate::project::{Project, ProjectDomain};
use crate::runtime::{check_compose, check_docker, ComposeRunner, ContainerRuntime, IoMode};
use crate::sync::{Supervisor, SyncTarget, SyncTool, Transition};
use crate::templates;
use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

impl<C, R, D, S> Orchestrator<C, R, D, S>
where
    C: ProductConfig,
    R: ContainerRuntime,
    D: ComposeRunner,
    S: SyncTool,
{
    /// Run a composition command against the project environment
    ///
    /// The roster is detached or attached before the command and the sync
    /// session (re)started after it.
    pub async fn env(&mut self, args: &[String]) -> Result<()> {
        let project = self.project()?;
        check_docker(&self.runtime).await?;
        check_compose(&self.compose).await?;

        if args.is_empty() {
            let plan = self.build_plan(&project)?;
            self.run_compose(&plan, &["--help".to_string()], IoMode::Filtered(self.output_filter()))
                .await?;
            return Ok(());
        }

        let verb = verb(args).unwrap_or_default().to_string();
        let network = project.network_name();
        let sync_enabled = self.params.get_bool(&self.config.key("sync_enabled"));
        let transition = if sync_enabled {
            Transition::for_args(args)
        } else {
            None
        };
        let mut args = args.to_vec();

        if verb == "down" {
            self.peer(PeerAction::Disconnect, &network, true).await;
        }

        if verb == "up" {
            if !self.runtime.network_exists(&network).await? {
                eprintln!("{}", format!("Creating network {}...", network).cyan());
                let plan = self.build_plan(&project)?;
                self.run_compose(&plan, &inject_no_start(&args), IoMode::Filtered(self.output_filter()))
                    .await
                    .context("creating the project network")?;
            }
            self.peer(PeerAction::Connect, &network, true).await;
            args = inject_detach(&args);
        }

        if verb != "config" {
            self.resolve_traefik_address(&network).await?;
        }
        if matches!(verb.as_str(), "up" | "start") && transition.is_some() {
            self.prepare_sync(&project).await?;
        }

        if transition == Some(Transition::Pause) {
            self.apply_sync(&project, Transition::Pause).await?;
        }

        let plan = self.build_plan(&project)?;
        self.run_compose(&plan, &args, IoMode::Filtered(self.output_filter()))
            .await?;

        match transition {
            Some(Transition::Pause) | None => {}
            Some(t) => self.apply_sync(&project, t).await?,
        }
        Ok(())
    }

    /// Apply the roster to `network`; failures never abort the command
    pub(crate) async fn peer(&self, action: PeerAction, network: &str, with_domain: bool) {
        let domain = ProjectDomain::from_params(&self.params);
        let roster = peered::roster(
            &self.config,
            &self.params,
            with_domain.then_some(&domain),
        );
        let outcomes = peered::apply(&self.runtime, action, network, &roster).await;
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        debug!(%action, network, attempted = outcomes.len(), failed, "peered services");
    }

    /// Record traefik's address on the project network for templates
    async fn resolve_traefik_address(&mut self, network: &str) -> Result<()> {
        let labels = vec![
            format!("dev.{}.container.name=traefik", self.config.name()),
            format!("dev.{}.environment.name={}", self.config.name(), self.config.name()),
        ];
        let id = self
            .runtime
            .container_id_by_label(&labels)
            .await
            .with_context(|| format!("looking up traefik; is `{} svc up` running?", self.config.name()))?;
        match self.runtime.container_address(&id, network).await? {
            Some(address) => {
                debug!(%address, "traefik address");
                self.params.set("traefik_address", address);
            }
            None => debug!(network, "traefik is not attached to the project network"),
        }
        Ok(())
    }

    /// Make sure the sync tool and its configuration exist
    async fn prepare_sync(&self, project: &Project) -> Result<()> {
        self.ensure_sync_tool().await?;
        let path = self
            .cwd
            .join(self.config.project_dir_name())
            .join("mutagen.yml");
        templates::generate_mutagen_config(
            &self.registry(),
            &self.params,
            project.env_type,
            self.host.os,
            &path,
        )?;
        Ok(())
    }

    pub(crate) async fn apply_sync(&self, project: &Project, transition: Transition) -> Result<()> {
        let target = SyncTarget::for_project(&self.config, project, &self.params);
        Supervisor::new(&self.runtime, &self.sync)
            .with_poll_interval(self.poll_interval)
            .apply(transition, &target)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::config::HostOs;
    use crate::testing::{FakeCompose, FakeRuntime, Journal};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn infra(journal: &Journal) -> FakeRuntime {
        FakeRuntime::new(journal.clone())
            .with_container("traefik", "t1")
            .with_labels(
                "t1",
                &["dev.reward.container.name=traefik", "dev.reward.environment.name=reward"],
            )
            .with_container("tunnel", "t2")
            .with_container("mailhog", "t3")
            .with_container("phpmyadmin", "t4")
            .with_container("elastichq", "t5")
            .with_address("t1", "foo_default", "172.20.0.2")
    }

    #[tokio::test]
    async fn test_up_creates_network_then_attaches_roster() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let runtime = infra(&journal);
        let compose = FakeCompose::new(journal.clone()).creating_network(&runtime, "foo_default");
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "magento2"),
            HostOs::Linux,
            runtime,
            compose,
            &journal,
        );

        orch.env(&args(&["up"])).await.unwrap();

        assert_eq!(
            journal.entries(),
            vec![
                "docker compose up --no-start",
                "docker network connect --alias foo.test --alias foo.test foo_default t1",
                "docker network connect foo_default t2",
                "docker network connect foo_default t3",
                "docker network connect foo_default t4",
                "docker network connect foo_default t5",
                "docker compose up --detach",
            ]
        );
        assert_eq!(orch.params.get_string("traefik_address"), "172.20.0.2");
    }

    #[tokio::test]
    async fn test_up_with_existing_network_skips_prelude() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let runtime = infra(&journal).with_network("foo_default");
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "magento2"),
            HostOs::Linux,
            runtime,
            FakeCompose::new(journal.clone()),
            &journal,
        );

        orch.env(&args(&["up", "-d"])).await.unwrap();
        assert_eq!(
            journal.entries(),
            vec![
                "docker network connect --alias foo.test --alias foo.test foo_default t1",
                "docker network connect foo_default t2",
                "docker network connect foo_default t3",
                "docker network connect foo_default t4",
                "docker network connect foo_default t5",
                "docker compose up -d",
            ]
        );
    }

    #[tokio::test]
    async fn test_ps_resolves_traefik_address() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let runtime = infra(&journal).with_network("foo_default");
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "magento2"),
            HostOs::Linux,
            runtime,
            FakeCompose::new(journal.clone()),
            &journal,
        );

        orch.env(&args(&["ps"])).await.unwrap();
        assert_eq!(journal.entries(), vec!["docker compose ps"]);
        assert_eq!(orch.params.get_string("traefik_address"), "172.20.0.2");
    }

    #[tokio::test]
    async fn test_config_skips_traefik_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "laravel"),
            HostOs::Linux,
            FakeRuntime::new(journal.clone()),
            FakeCompose::new(journal.clone()),
            &journal,
        );

        orch.env(&args(&["config"])).await.unwrap();
        assert_eq!(journal.entries(), vec!["docker compose config"]);
        assert_eq!(orch.params.get_string("traefik_address"), "");
    }

    #[tokio::test]
    async fn test_down_disconnects_before_compose() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let runtime = infra(&journal).with_network("foo_default");
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "magento2"),
            HostOs::Linux,
            runtime,
            FakeCompose::new(journal.clone()),
            &journal,
        );

        orch.env(&args(&["down"])).await.unwrap();
        let entries = journal.entries();
        assert_eq!(entries.first().unwrap(), "docker network disconnect foo_default t1");
        assert_eq!(entries.last().unwrap(), "docker compose down");
        assert_eq!(entries.len(), 6);
    }

    #[tokio::test]
    async fn test_no_args_shows_help() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "laravel"),
            HostOs::Linux,
            infra(&journal),
            FakeCompose::new(journal.clone()),
            &journal,
        );

        orch.env(&[]).await.unwrap();
        assert_eq!(journal.entries(), vec!["docker compose --help"]);
    }

    #[tokio::test]
    async fn test_darwin_up_and_stop_drive_sync() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let runtime = infra(&journal).with_network("foo_default").with_labeled(
            "p1",
            &["dev.reward.container.name=php-fpm", "dev.reward.environment.name=foo"],
        );
        let mut orch = orchestrator(
            dir.path(),
            project_params(dir.path(), "magento2"),
            HostOs::Darwin,
            runtime,
            FakeCompose::new(journal.clone()),
            &journal,
        );

        orch.env(&args(&["up"])).await.unwrap();
        assert!(dir.path().join(".reward/mutagen.yml").exists());
        let entries: Vec<_> = journal
            .entries()
            .into_iter()
            .filter(|e| !e.starts_with("docker network"))
            .collect();
        assert_eq!(entries[0], "docker compose up --detach");
        assert_eq!(entries[1], "mutagen sync terminate reward-sync=foo");
        assert!(entries[2].starts_with("mutagen sync create -c "));
        assert!(entries[2].ends_with(" docker://p1/var/www/html"));

        journal.clear();
        orch.env(&args(&["stop"])).await.unwrap();
        assert_eq!(
            journal.entries(),
            vec!["mutagen sync pause reward-sync=foo", "docker compose stop"]
        );
    }
}
