//! Version gates and host checks

use super::compose::ComposeRunner;
use super::docker::ContainerRuntime;
use crate::config::{HostInfo, HostOs, Params};
use crate::error::EnvError;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use semver::Version;
use tracing::debug;

pub const DOCKER_REQUIRED: &str = "20.4.0";
pub const COMPOSE_REQUIRED: &str = "2.0.0";

/// Parse version string, handling various formats
///
/// Accepts a leading `v`, two-component versions and vendor suffixes
/// (`20.10.7-ce`, `v2.20.2-desktop.1`); only the numeric core is kept.
pub fn parse_version(version_str: &str) -> Result<Version> {
    let trimmed = version_str.trim();
    let cleaned = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let core: String = cleaned
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let parts: Vec<u64> = match core
        .split('.')
        .filter(|p| !p.is_empty())
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(parts) => parts,
        Err(_) => anyhow::bail!("Invalid version '{}'", version_str),
    };

    match parts.as_slice() {
        [] => anyhow::bail!("Invalid version '{}'", version_str),
        [major] => Ok(Version::new(*major, 0, 0)),
        [major, minor] => Ok(Version::new(*major, *minor, 0)),
        [major, minor, patch, ..] => Ok(Version::new(*major, *minor, *patch)),
    }
}

/// Fail with `VersionTooOld` when `found` is below `required`
pub fn require_min(tool: &str, found: &str, required: &str) -> Result<()> {
    let found_ver = parse_version(found)?;
    let required_ver = parse_version(required)?;
    if found_ver < required_ver {
        return Err(EnvError::VersionTooOld {
            tool: tool.to_string(),
            found: found.trim().to_string(),
            required: required.to_string(),
        }
        .into());
    }
    debug!(tool, found = %found_ver, "version ok");
    Ok(())
}

/// The container runtime must be reachable and recent enough
pub async fn check_docker<R: ContainerRuntime>(runtime: &R) -> Result<()> {
    let version = runtime.version().await?;
    require_min("docker", &version, DOCKER_REQUIRED)
}

/// The composition tool must be recent enough
pub async fn check_compose<C: ComposeRunner>(compose: &C) -> Result<()> {
    let version = compose
        .version()
        .await
        .context("Cannot determine docker compose version")?;
    require_min("docker compose", &version, COMPOSE_REQUIRED)
}

/// Refuse to run as root unless explicitly allowed
pub fn check_superuser<C: ProductConfig>(config: &C, params: &Params, host: &HostInfo) -> Result<()> {
    if host.os == HostOs::Windows || host.euid != Some(0) {
        return Ok(());
    }
    let key = config.key("allow_superuser");
    if params.get_bool(&key) {
        return Ok(());
    }
    Err(EnvError::SuperuserForbidden(key.to_uppercase()).into())
}

/// Effective uid of this process
#[cfg(unix)]
pub fn effective_uid() -> Option<u32> {
    Some(nix::unistd::geteuid().as_raw())
}

#[cfg(not(unix))]
pub fn effective_uid() -> Option<u32> {
    None
}
