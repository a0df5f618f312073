//! Plan building: rendered fragments to composition tool arguments
//!
//! Rendered fragments are parsed into composition documents, serialized to
//! temporary files and turned into the argument vector for the composition
//! tool. Output filtering and the SQL import rewrite live in submodules.

pub mod filter;
pub mod sql;
pub mod tempfiles;

use crate::error::EnvError;
use crate::templates::RenderedFragment;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use filter::{inject_detach, inject_no_start, OutputFilter};
pub use sql::{rewrite_line, SqlRewriter};
pub use tempfiles::TempFiles;

/// One parsed composition document with its logical name
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeConfig {
    pub name: String,
    pub document: Value,
}

/// Ordered composition documents; later entries override earlier ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSet {
    configs: Vec<ComposeConfig>,
}

const SECTIONS: [&str; 3] = ["services", "volumes", "networks"];

impl ConfigSet {
    /// Parse rendered fragments, keeping their order
    ///
    /// An empty document (a fragment whose content was entirely switched
    /// off) becomes an empty mapping.
    pub fn parse(fragments: &[RenderedFragment]) -> Result<Self> {
        let mut configs = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let document: Value =
                serde_yaml::from_str(&fragment.document).map_err(|source| {
                    EnvError::FragmentParse {
                        name: fragment.name.clone(),
                        source,
                    }
                })?;
            let document = match document {
                Value::Null => Value::Mapping(Default::default()),
                other => other,
            };
            configs.push(ComposeConfig {
                name: fragment.name.clone(),
                document,
            });
        }
        Ok(Self { configs })
    }

    pub fn configs(&self) -> &[ComposeConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Keys declared across the set: `services.<name>`, `volumes.<name>`,
    /// `networks.<name>` and any other top-level key
    pub fn declared_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for config in &self.configs {
            let Some(map) = config.document.as_mapping() else {
                continue;
            };
            for (key, value) in map {
                let Some(key) = key.as_str() else { continue };
                if SECTIONS.contains(&key) {
                    if let Some(inner) = value.as_mapping() {
                        keys.extend(
                            inner
                                .keys()
                                .filter_map(Value::as_str)
                                .map(|k| format!("{}.{}", key, k)),
                        );
                    }
                } else {
                    keys.insert(key.to_string());
                }
            }
        }
        keys
    }

    /// Write each document to a fresh temporary file registered in `temp`
    pub fn materialize(
        &self,
        temp: &TempFiles,
        project_dir: &Path,
        project_name: &str,
    ) -> Result<Plan> {
        let mut files = Vec::with_capacity(self.configs.len());
        for config in &self.configs {
            let text = serde_yaml::to_string(&config.document)
                .with_context(|| format!("Failed to serialize {}", config.name))?;

            let mut file = tempfile::Builder::new()
                .prefix("reward-")
                .suffix(".yml")
                .tempfile()
                .context("Failed to create temporary file")?;
            file.write_all(text.as_bytes())
                .with_context(|| format!("Failed to write {}", config.name))?;
            let (_, path) = file.keep().context("Failed to keep temporary file")?;

            debug!(template = %config.name, path = %path.display(), "config written");
            temp.register(path.clone());
            files.push(path);
        }

        Ok(Plan {
            project_dir: project_dir.to_path_buf(),
            project_name: project_name.to_string(),
            files,
        })
    }
}

/// Materialized config files plus the wiring the composition tool needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub project_dir: PathBuf,
    pub project_name: String,
    pub files: Vec<PathBuf>,
}

impl Plan {
    /// `[--project-directory <dir>, --project-name <name>, -f <f1>, ..., <args>...]`
    pub fn argv<S: AsRef<str>>(&self, user_args: &[S]) -> Vec<String> {
        let mut argv = vec![
            "--project-directory".to_string(),
            self.project_dir.display().to_string(),
            "--project-name".to_string(),
            self.project_name.clone(),
        ];
        for file in &self.files {
            argv.push("-f".to_string());
            argv.push(file.display().to_string());
        }
        argv.extend(user_args.iter().map(|a| a.as_ref().to_string()));
        argv
    }
}
