//! Container runtime access through the docker CLI

use super::{capture, CommandOutput};
use crate::error::EnvError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// A container as listed by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub state: String,
}

/// A network as listed by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSummary {
    pub id: String,
    pub name: String,
}

/// Operations the engine needs from the container runtime
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// Server version; fails with `RuntimeUnavailable` when unreachable
    async fn version(&self) -> Result<String>;

    async fn network_exists(&self, name: &str) -> Result<bool>;

    async fn networks_by_label(&self, label: &str) -> Result<Vec<NetworkSummary>>;

    /// Containers whose name is exactly `name`
    async fn containers_by_name(&self, name: &str) -> Result<Vec<ContainerSummary>>;

    /// The single container carrying every label in `labels`
    async fn container_id_by_label(&self, labels: &[String]) -> Result<String>;

    /// Runtime state (`running`, `exited`, ...) of a container
    async fn container_state(&self, id: &str) -> Result<String>;

    /// The container's address in `network`, if attached
    async fn container_address(&self, id: &str, network: &str) -> Result<Option<String>>;

    async fn network_connect(&self, network: &str, container: &str, aliases: &[String])
        -> Result<()>;

    async fn network_disconnect(&self, network: &str, container: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct NetworkLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
}

fn json_lines<'a, T: Deserialize<'a>>(stdout: &'a str) -> Result<Vec<T>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).with_context(|| format!("Unexpected docker output: {}", l)))
        .collect()
}

/// Docker CLI driver
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = capture(&self.program, args).await.map_err(|e| {
            anyhow::Error::new(EnvError::RuntimeUnavailable(format!("{:#}", e)))
        })?;
        if !output.success() && is_daemon_unreachable(&output.stderr) {
            return Err(EnvError::RuntimeUnavailable(output.stderr.trim().to_string()).into());
        }
        Ok(output)
    }

    async fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.success() {
            anyhow::bail!(
                "docker {} failed: {}",
                args.first().copied().unwrap_or_default(),
                output.stderr.trim()
            );
        }
        Ok(output.stdout)
    }
}

fn is_daemon_unreachable(stderr: &str) -> bool {
    stderr.contains("Cannot connect to the Docker daemon")
        || stderr.contains("error during connect")
}

impl ContainerRuntime for DockerCli {
    async fn version(&self) -> Result<String> {
        let output = self
            .run(&["version", "--format", "{{.Server.Version}}"])
            .await?;
        if !output.success() {
            return Err(EnvError::RuntimeUnavailable(output.stderr.trim().to_string()).into());
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        let filter = format!("name=^{}$", name);
        let stdout = self
            .run_ok(&["network", "ls", "--filter", &filter, "--format", "{{json .}}"])
            .await?;
        let networks: Vec<NetworkLine> = json_lines(&stdout)?;
        Ok(networks.iter().any(|n| n.name == name))
    }

    async fn networks_by_label(&self, label: &str) -> Result<Vec<NetworkSummary>> {
        let filter = format!("label={}", label);
        let stdout = self
            .run_ok(&["network", "ls", "--filter", &filter, "--format", "{{json .}}"])
            .await?;
        let networks: Vec<NetworkLine> = json_lines(&stdout)?;
        Ok(networks
            .into_iter()
            .map(|n| NetworkSummary {
                id: n.id,
                name: n.name,
            })
            .collect())
    }

    async fn containers_by_name(&self, name: &str) -> Result<Vec<ContainerSummary>> {
        let filter = format!("name=^{}$", name);
        let stdout = self
            .run_ok(&["ps", "-a", "--no-trunc", "--filter", &filter, "--format", "{{json .}}"])
            .await?;
        let containers: Vec<PsLine> = json_lines(&stdout)?;
        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id,
                name: c.names,
                state: c.state,
            })
            .collect())
    }

    async fn container_id_by_label(&self, labels: &[String]) -> Result<String> {
        let mut args = vec!["ps", "--no-trunc", "--format", "{{json .}}"];
        let filters: Vec<String> = labels.iter().map(|l| format!("label={}", l)).collect();
        for filter in &filters {
            args.push("--filter");
            args.push(filter.as_str());
        }
        let stdout = self.run_ok(&args).await?;
        let containers: Vec<PsLine> = json_lines(&stdout)?;
        match containers.as_slice() {
            [only] => Ok(only.id.clone()),
            _ => {
                debug!(?labels, matches = containers.len(), "container lookup");
                Err(EnvError::ContainerNotFound(labels.join(", ")).into())
            }
        }
    }

    async fn container_state(&self, id: &str) -> Result<String> {
        let output = self
            .run(&["inspect", "--format", "{{.State.Status}}", id])
            .await?;
        if !output.success() {
            return Err(EnvError::ContainerNotFound(id.to_string()).into());
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn container_address(&self, id: &str, network: &str) -> Result<Option<String>> {
        let output = self
            .run(&["inspect", "--format", "{{json .NetworkSettings.Networks}}", id])
            .await?;
        if !output.success() {
            return Err(EnvError::ContainerNotFound(id.to_string()).into());
        }
        let networks: HashMap<String, Endpoint> = serde_json::from_str(output.stdout.trim())
            .context("Unexpected docker inspect output")?;
        Ok(networks
            .get(network)
            .map(|e| e.ip_address.clone())
            .filter(|ip| !ip.is_empty()))
    }

    async fn network_connect(
        &self,
        network: &str,
        container: &str,
        aliases: &[String],
    ) -> Result<()> {
        let mut args = vec!["network", "connect"];
        for alias in aliases {
            args.push("--alias");
            args.push(alias.as_str());
        }
        args.push(network);
        args.push(container);
        self.run_ok(&args)
            .await
            .with_context(|| format!("connecting {} to {}", container, network))?;
        Ok(())
    }

    async fn network_disconnect(&self, network: &str, container: &str) -> Result<()> {
        self.run_ok(&["network", "disconnect", network, container])
            .await
            .with_context(|| format!("disconnecting {} from {}", container, network))?;
        Ok(())
    }
}
