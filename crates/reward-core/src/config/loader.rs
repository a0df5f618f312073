//! Loading of the file-backed parameter layers

use super::{HostOs, Layer, Params};
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Builds a `Params` from the project directory, the user configuration file
/// and the process environment
#[derive(Debug, Clone)]
pub struct Loader {
    cwd: PathBuf,
    user_home: PathBuf,
    config_file: PathBuf,
}

impl Loader {
    pub fn new<C: ProductConfig>(config: &C, cwd: &Path, user_home: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            user_home: user_home.to_path_buf(),
            config_file: user_home.join(config.config_file_name()),
        }
    }

    /// Use a different user configuration file
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = path;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Resolve every layer except the type seed, which needs the env type
    pub fn load<C, I>(
        &self,
        config: &C,
        os: HostOs,
        flags: &BTreeMap<String, Value>,
        process_env: I,
    ) -> Result<Params>
    where
        C: ProductConfig,
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Params::new().with_process_env(process_env);

        for (k, v) in flags {
            params.set_flag(k, v.clone());
        }

        for (k, v) in read_user_config(&self.config_file)? {
            params.insert(Layer::UserConfig, &k, v);
        }

        let env_path = self.cwd.join(".env");
        for (k, v) in read_env_file(&env_path)? {
            params.set_dotenv(&k, v);
        }

        apply_builtin_defaults(config, &mut params, &self.user_home, os);

        Ok(params)
    }
}

/// Read a user configuration YAML map; a missing file yields nothing
pub fn read_user_config(path: &Path) -> Result<BTreeMap<String, Value>> {
    if !path.exists() {
        trace!(path = %path.display(), "user config not found");
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut out = BTreeMap::new();
    for (k, v) in raw {
        let value = serde_json::to_value(&v)
            .with_context(|| format!("Unsupported value for '{}' in {}", k, path.display()))?;
        out.insert(k.to_lowercase(), value);
    }
    debug!(path = %path.display(), keys = out.len(), "user config loaded");
    Ok(out)
}

/// Read a project env-file; a missing file yields nothing
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    if !path.exists() {
        trace!(path = %path.display(), "env file not found");
        return Ok(Vec::new());
    }

    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut out = Vec::new();
    for item in iter {
        let (k, v) = item.with_context(|| format!("Failed to parse {}", path.display()))?;
        out.push((k, v));
    }
    debug!(path = %path.display(), keys = out.len(), "env file loaded");
    Ok(out)
}

/// Built-in defaults, the lowest precedence layer
pub fn apply_builtin_defaults<C: ProductConfig>(
    config: &C,
    params: &mut Params,
    user_home: &Path,
    os: HostOs,
) {
    let app_home = user_home.join(format!(".{}", config.name()));
    let key = |s: &str| config.key(s);

    params.set_default("app_name", config.name());
    params.set_default(&key("home_dir"), app_home.display().to_string());
    params.set_default(&key("ssl_dir"), app_home.join("ssl").display().to_string());
    params.set_default(&key("runtime_os"), os.as_str());
    params.set_default(&key("service_domain"), format!("{}.test", config.name()));
    params.set_default(&key("resolve_domain_to_traefik"), true);
    params.set_default(&key("mutagen_required_version"), "0.11.8");
    params.set_default(&key("mutagen_url"), config.default_mutagen_url());
    params.set_default(&key("sync_poll_interval"), 5);

    params.set_default(&key("env_db_container"), "db");
    params.set_default(&key("env_db_command"), "mysql");
    params.set_default(&key("env_db_dump_command"), "mysqldump");
    params.set_default(&key("db_import_line_buffer_size"), 10);
    params.set_default(&key("blackfire_container"), "php-blackfire");
    params.set_default(&key("blackfire_command"), "blackfire");
    params.set_default(&key("debug_container"), "php-debug");

    params.set_default(&key("tunnel"), true);
    params.set_default(&key("mailhog"), true);
    params.set_default(&key("phpmyadmin"), true);
    params.set_default(&key("elastichq"), true);

    params.set_default("log_level", "warn");
}

/// The invoking user's home directory
pub fn user_home() -> Result<PathBuf> {
    dirs::home_dir().context("Cannot determine the home directory")
}

/// The application home directory after defaults are applied
pub fn app_home<C: ProductConfig>(config: &C, params: &Params) -> PathBuf {
    PathBuf::from(params.get_string(&config.key("home_dir")))
}
