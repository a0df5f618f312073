//! Fragment templates: lookup, selection and rendering
//!
//! This module provides:
//! - The embedded asset table and tiered registry (`TemplateRegistry`)
//! - The fragment selector (`select`)
//! - Tera-based rendering with an `enabled` truthiness helper (`TemplateSet`)
//! - Generators for files rendered outside the composition plan (sync
//!   configuration, edge proxy configuration)

pub mod assets;
pub mod registry;
pub mod render;
pub mod selector;

use crate::config::{HostOs, Params};
use crate::project::EnvType;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub use registry::{FragmentTemplate, TemplateRegistry, Tier};
pub use render::{is_enabled, RenderedFragment, TemplateSet};
pub use selector::{select, Fragment};

pub const SERVICES_TEMPLATE: &str = "templates/_services/docker-compose.yml";
pub const TRAEFIK_TEMPLATE: &str = "templates/_traefik/traefik.yml";

/// Collect the templates for a fragment list, in selection order
pub fn build_environment_set(
    registry: &TemplateRegistry,
    fragments: &[Fragment],
    env_type: EnvType,
    os: HostOs,
) -> Result<TemplateSet> {
    let mut set = TemplateSet::new();
    for fragment in fragments {
        let paths = fragment.template_paths(env_type, os);
        match fragment {
            Fragment::Environment(_) => set.append_from(registry, &paths),
            Fragment::Overlay(_) => set.append_user_from(registry, &paths),
        }
        .with_context(|| format!("appending {} templates", fragment.name()))?;
    }
    Ok(set)
}

fn mutagen_template_paths(env_type: EnvType, os: HostOs) -> Vec<String> {
    vec![
        format!("templates/environments/{0}/{0}.mutagen.yml", env_type),
        format!("templates/environments/{0}/{0}.mutagen.{1}.yml", env_type, os),
    ]
}

/// Render the sync configuration to `path` unless it already exists
///
/// Returns whether a file was written.
pub fn generate_mutagen_config(
    registry: &TemplateRegistry,
    params: &Params,
    env_type: EnvType,
    os: HostOs,
    path: &Path,
) -> Result<bool> {
    if path.exists() {
        debug!(path = %path.display(), "sync configuration exists, skipping");
        return Ok(false);
    }

    let mut set = TemplateSet::new();
    set.append_from(registry, &mutagen_template_paths(env_type, os))?;
    let rendered = set.render_all(&render::context(params)?)?;
    let content: String = rendered.into_iter().map(|r| r.document).collect();

    write_file(path, &content)?;
    debug!(path = %path.display(), "sync configuration written");
    Ok(true)
}

/// Render the edge proxy's static configuration into the application home
pub fn generate_traefik_config(
    registry: &TemplateRegistry,
    params: &Params,
    app_home: &Path,
) -> Result<PathBuf> {
    let template = registry
        .lookup(TRAEFIK_TEMPLATE)?
        .with_context(|| format!("Template {} is missing", TRAEFIK_TEMPLATE))?;
    let content = render::render_text(&template.name, &template.text, params)?;

    let path = app_home.join("etc/traefik/traefik.yml");
    write_file(&path, &content)?;
    Ok(path)
}

/// Write the edge proxy's TLS configuration listing every certificate pair
/// under `<ssl_dir>/certs`
///
/// A `.crt.pem` without its `.key.pem` is left out.
pub fn generate_traefik_dynamic_config(
    app_home: &Path,
    ssl_dir: &Path,
    service_domain: &str,
) -> Result<PathBuf> {
    let mut config = format!(
        "tls:
  stores:
    default:
      defaultCertificate:
        certFile: /etc/ssl/certs/{0}.crt.pem
        keyFile: /etc/ssl/certs/{0}.key.pem
  certificates:
",
        service_domain
    );

    let certs_dir = ssl_dir.join("certs");
    let mut names: Vec<String> = WalkDir::new(&certs_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.file_name()
                .to_str()
                .and_then(|n| n.strip_suffix(".crt.pem"))
                .map(str::to_string)
        })
        .filter(|name| certs_dir.join(format!("{}.key.pem", name)).is_file())
        .collect();
    names.sort();
    debug!(certificates = ?names, "available certificates");

    for name in &names {
        config.push_str(&format!(
            "    - certFile: /etc/ssl/certs/{0}.crt.pem\n      keyFile: /etc/ssl/certs/{0}.key.pem\n",
            name
        ));
    }

    let path = app_home.join("etc/traefik/dynamic.yml");
    write_file(&path, &config)?;
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
