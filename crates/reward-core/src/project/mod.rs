//! Project identity: environment type, environment name and working directory
//!
//! This module provides:
//! - The closed set of environment types (`EnvType`)
//! - RFC-1178 style environment name validation (`EnvName`)
//! - The `Project` triple read back from resolved parameters
//! - Env-file seeding for `env-init` (see [`seed`])

pub mod seed;

use crate::config::Params;
use crate::error::EnvError;
use crate::product::ProductConfig;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

/// Supported environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvType {
    GenericPhp,
    Magento1,
    Magento2,
    Laravel,
    PwaStudio,
    Symfony,
    Shopware,
    Wordpress,
}

impl EnvType {
    pub const ALL: [EnvType; 8] = [
        EnvType::GenericPhp,
        EnvType::Magento1,
        EnvType::Magento2,
        EnvType::Laravel,
        EnvType::PwaStudio,
        EnvType::Symfony,
        EnvType::Shopware,
        EnvType::Wordpress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvType::GenericPhp => "generic-php",
            EnvType::Magento1 => "magento1",
            EnvType::Magento2 => "magento2",
            EnvType::Laravel => "laravel",
            EnvType::PwaStudio => "pwa-studio",
            EnvType::Symfony => "symfony",
            EnvType::Shopware => "shopware",
            EnvType::Wordpress => "wordpress",
        }
    }

    /// Types that ship their own php-fpm image variant
    pub fn has_php_variant(&self) -> bool {
        matches!(
            self,
            EnvType::Magento1 | EnvType::Magento2 | EnvType::Wordpress | EnvType::Shopware
        )
    }

    pub fn is_pwa_studio(&self) -> bool {
        matches!(self, EnvType::PwaStudio)
    }

    /// Comma-separated list of valid type names, for error messages
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EnvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnvType {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| EnvError::UnknownEnvType {
                given: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

fn env_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("static env name pattern")
    })
}

/// A validated, lowercased environment name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvName(String);

impl EnvName {
    pub fn parse(raw: &str) -> Result<Self, EnvError> {
        if !env_name_pattern().is_match(raw) {
            return Err(EnvError::InvalidEnvName(raw.to_string()));
        }
        Ok(Self(raw.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The per-project network created by the composition tool
    pub fn network_name(&self) -> String {
        format!("{}_default", self.0)
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project identity triple
#[derive(Debug, Clone)]
pub struct Project {
    pub name: EnvName,
    pub env_type: EnvType,
    pub dir: PathBuf,
}

impl Project {
    /// Read the project identity from resolved parameters
    ///
    /// Fails with `EnvEmpty` when the env-file is missing or lacks a name.
    pub fn from_params<C: ProductConfig>(
        config: &C,
        params: &Params,
        dir: &Path,
    ) -> Result<Self, EnvError> {
        let name_key = config.key("env_name");
        let raw_name = params.get_string(&name_key);
        if raw_name.is_empty() {
            return Err(EnvError::EnvEmpty(format!(
                "{} is not set in {}; run `{} env-init <name> <type>` first",
                name_key.to_uppercase(),
                dir.join(".env").display(),
                config.name()
            )));
        }
        let name = EnvName::parse(&raw_name)?;

        let type_key = config.key("env_type");
        let raw_type = params.get_string(&type_key);
        if raw_type.is_empty() {
            return Err(EnvError::EnvEmpty(format!(
                "{} is not set in {}",
                type_key.to_uppercase(),
                dir.join(".env").display()
            )));
        }
        let env_type = raw_type.parse()?;

        Ok(Self {
            name,
            env_type,
            dir: dir.to_path_buf(),
        })
    }

    pub fn network_name(&self) -> String {
        self.name.network_name()
    }

    /// Web root relative to the project directory, always with a leading `/`
    pub fn web_root<C: ProductConfig>(&self, config: &C, params: &Params) -> String {
        let raw = params.get_string(&config.key("web_root"));
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Bare and fully qualified project domains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDomain {
    pub domain: String,
    pub subdomain: String,
}

impl ProjectDomain {
    pub fn from_params(params: &Params) -> Self {
        Self {
            domain: params.get_string("traefik_domain"),
            subdomain: params.get_string("traefik_subdomain"),
        }
    }

    /// `<subdomain>.<domain>`, or the bare domain when no subdomain is set
    pub fn full_domain(&self) -> String {
        if self.subdomain.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.subdomain, self.domain)
        }
    }
}
