//! Env-file seeding for `env-init`
//!
//! The seed is the identity header followed by a type stanza of feature flags
//! and default service versions. The same stanza doubles as the lowest
//! precedence parameter layer for its type, so a project whose `.env` lost a
//! flag still selects the type's default services.

use super::{EnvName, EnvType};
use crate::error::EnvError;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Type-specific stanza; `{P}` is replaced by the env-file key prefix
fn stanza_template(env_type: EnvType) -> &'static str {
    match env_type {
        EnvType::GenericPhp => {
            "{P}_DB=true
{P}_REDIS=true

MARIADB_VERSION=10.4
NODE_VERSION=16
PHP_VERSION=7.4
REDIS_VERSION=6.0
COMPOSER_VERSION=2

MYSQL_ROOT_PASSWORD=app
MYSQL_DATABASE=app
MYSQL_USER=app
MYSQL_PASSWORD=app

NGINX_ROOT=/var/www/html
NGINX_PUBLIC=
"
        }
        EnvType::Magento1 => {
            "{P}_DB=true
{P}_REDIS=true

MARIADB_VERSION=10.3
NODE_VERSION=12
PHP_VERSION=7.2
REDIS_VERSION=5.0
COMPOSER_VERSION=1

{P}_SELENIUM=false
{P}_SELENIUM_DEBUG=false
{P}_BLACKFIRE=false

BLACKFIRE_CLIENT_ID=
BLACKFIRE_CLIENT_TOKEN=
BLACKFIRE_SERVER_ID=
BLACKFIRE_SERVER_TOKEN=
"
        }
        EnvType::Magento2 => {
            "{P}_DB=true
{P}_ELASTICSEARCH=true
{P}_VARNISH=true
{P}_RABBITMQ=true
{P}_REDIS=true

ELASTICSEARCH_VERSION=7.12
MARIADB_VERSION=10.3
NODE_VERSION=12
PHP_VERSION=7.4
RABBITMQ_VERSION=3.8
REDIS_VERSION=5.0
VARNISH_VERSION=6.5
COMPOSER_VERSION=2

{P}_SYNC_IGNORE=

{P}_ALLURE=false
{P}_SELENIUM=false
{P}_SELENIUM_DEBUG=false
{P}_BLACKFIRE=false
{P}_SPLIT_SALES=false
{P}_SPLIT_CHECKOUT=false
{P}_TEST_DB=false
{P}_MAGEPACK=false

BLACKFIRE_CLIENT_ID=
BLACKFIRE_CLIENT_TOKEN=
BLACKFIRE_SERVER_ID=
BLACKFIRE_SERVER_TOKEN=
"
        }
        EnvType::Laravel => {
            "MARIADB_VERSION=10.4
NODE_VERSION=12
PHP_VERSION=7.4
REDIS_VERSION=5.0
COMPOSER_VERSION=2

{P}_DB=true
{P}_REDIS=true

APP_ENV=local
APP_DEBUG=true

DB_CONNECTION=mysql
DB_HOST=db
DB_PORT=3306
DB_DATABASE=laravel
DB_USERNAME=laravel
DB_PASSWORD=laravel

CACHE_DRIVER=redis
SESSION_DRIVER=redis

REDIS_HOST=redis
REDIS_PORT=6379

MAIL_DRIVER=sendmail
"
        }
        EnvType::PwaStudio => {
            "NODE_VERSION=12
{P}_VARNISH=false
VARNISH_VERSION=6.5
"
        }
        EnvType::Symfony => {
            "{P}_DB=true
{P}_REDIS=true
{P}_RABBITMQ=false
{P}_ELASTICSEARCH=false
{P}_VARNISH=false

MARIADB_VERSION=10.4
NODE_VERSION=12
PHP_VERSION=7.4
RABBITMQ_VERSION=3.8
REDIS_VERSION=5.0
VARNISH_VERSION=6.5
COMPOSER_VERSION=2
"
        }
        EnvType::Shopware => {
            "{P}_DB=true
{P}_REDIS=true
{P}_RABBITMQ=false
{P}_ELASTICSEARCH=false
{P}_VARNISH=false

MARIADB_VERSION=10.4
NODE_VERSION=12
PHP_VERSION=7.4
RABBITMQ_VERSION=3.8
REDIS_VERSION=5.0
VARNISH_VERSION=6.5
COMPOSER_VERSION=2
"
        }
        EnvType::Wordpress => {
            "MARIADB_VERSION=10.4
NODE_VERSION=12
PHP_VERSION=7.4
COMPOSER_VERSION=2

{P}_DB=true
{P}_REDIS=false

APP_ENV=local
APP_DEBUG=true

DB_CONNECTION=mysql
DB_HOST=db
DB_PORT=3306
DB_DATABASE=wordpress
DB_USERNAME=wordpress
DB_PASSWORD=wordpress
"
        }
    }
}

/// Type stanza with the key prefix applied
pub fn type_stanza(prefix: &str, env_type: EnvType) -> String {
    stanza_template(env_type).replace("{P}", prefix)
}

/// `KEY=VALUE` pairs of the type stanza, in file order
pub fn stanza_pairs(prefix: &str, env_type: EnvType) -> Vec<(String, String)> {
    type_stanza(prefix, env_type)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn default_web_root(env_type: EnvType) -> &'static str {
    match env_type {
        EnvType::Shopware => "/webroot",
        _ => "/",
    }
}

/// Full env-file content for a new project
pub fn env_file<C: ProductConfig>(config: &C, name: &EnvName, env_type: EnvType) -> String {
    let prefix = config.env_prefix();
    format!(
        "{p}_ENV_NAME={name}
{p}_ENV_TYPE={ty}
{p}_WEB_ROOT={root}

TRAEFIK_DOMAIN={name}.test
TRAEFIK_SUBDOMAIN=
TRAEFIK_EXTRA_HOSTS=

{stanza}",
        p = prefix,
        name = name,
        ty = env_type,
        root = default_web_root(env_type),
        stanza = type_stanza(&prefix, env_type),
    )
}

fn stanza_flag(pairs: &[(String, String)], key: &str) -> Option<bool> {
    pairs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| crate::config::parse_bool(v))
}

/// Write `.env` and the per-project override directory
///
/// An existing `.env` is only replaced when `confirm_overwrite` agrees;
/// declining fails with `FileExistsBlocking`. Running twice with the same
/// inputs produces the same file.
pub fn init_env_file<C, F>(
    config: &C,
    dir: &Path,
    name: &EnvName,
    env_type: EnvType,
    confirm_overwrite: F,
) -> Result<PathBuf>
where
    C: ProductConfig,
    F: FnOnce(&Path) -> Result<bool>,
{
    let env_path = dir.join(".env");
    if env_path.exists() && !confirm_overwrite(&env_path)? {
        return Err(EnvError::FileExistsBlocking(env_path).into());
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(&env_path, env_file(config, name, env_type))
        .with_context(|| format!("Failed to write {}", env_path.display()))?;
    debug!(path = %env_path.display(), %name, %env_type, "env file written");

    create_local_dirs(config, dir, env_type)?;

    Ok(env_path)
}

fn create_local_dirs<C: ProductConfig>(config: &C, dir: &Path, env_type: EnvType) -> Result<()> {
    let local_dir = dir.join(config.project_dir_name());
    if local_dir.exists() {
        return Ok(());
    }

    let pairs = stanza_pairs(&config.env_prefix(), env_type);
    let prefix = config.env_prefix();
    let mut dirs = vec![local_dir.clone()];
    // nginx is included unless switched off, varnish only when switched on
    if stanza_flag(&pairs, &format!("{}_NGINX", prefix)) != Some(false) {
        dirs.push(local_dir.join("nginx"));
    }
    if stanza_flag(&pairs, &format!("{}_VARNISH", prefix)) == Some(true) {
        dirs.push(local_dir.join("varnish"));
    }

    for d in dirs {
        fs::create_dir_all(&d).with_context(|| format!("Failed to create {}", d.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Reward;

    #[test]
    fn test_init_magento2_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let name = EnvName::parse("foo").unwrap();

        let path = init_env_file(&Reward, dir.path(), &name, EnvType::Magento2, |_| Ok(true))
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        for line in [
            "REWARD_ENV_NAME=foo",
            "REWARD_ENV_TYPE=magento2",
            "REWARD_WEB_ROOT=/",
            "TRAEFIK_DOMAIN=foo.test",
            "TRAEFIK_SUBDOMAIN=",
            "TRAEFIK_EXTRA_HOSTS=",
            "MARIADB_VERSION=10.3",
            "PHP_VERSION=7.4",
            "ELASTICSEARCH_VERSION=7.12",
            "COMPOSER_VERSION=2",
        ] {
            assert!(content.lines().any(|l| l == line), "missing {}", line);
        }

        let local = dir.path().join(".reward");
        assert!(local.join("nginx").is_dir());
        assert!(local.join("varnish").is_dir());
    }

    #[test]
    fn test_init_is_idempotent_with_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let name = EnvName::parse("foo").unwrap();

        let first = init_env_file(&Reward, dir.path(), &name, EnvType::Laravel, |_| Ok(true))
            .unwrap();
        let before = fs::read_to_string(&first).unwrap();

        let mut asked = false;
        init_env_file(&Reward, dir.path(), &name, EnvType::Laravel, |_| {
            asked = true;
            Ok(true)
        })
        .unwrap();
        assert!(asked);
        assert_eq!(before, fs::read_to_string(&first).unwrap());
    }

    #[test]
    fn test_init_declined_overwrite_blocks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "KEEP=1\n").unwrap();
        let name = EnvName::parse("foo").unwrap();

        let err = init_env_file(&Reward, dir.path(), &name, EnvType::Symfony, |_| Ok(false))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EnvError>(),
            Some(EnvError::FileExistsBlocking(_))
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join(".env")).unwrap(),
            "KEEP=1\n"
        );
    }

    #[test]
    fn test_shopware_web_root() {
        let name = EnvName::parse("shop").unwrap();
        let content = env_file(&Reward, &name, EnvType::Shopware);
        assert!(content.contains("REWARD_WEB_ROOT=/webroot\n"));
    }

    #[test]
    fn test_symfony_skips_varnish_dir() {
        let dir = tempfile::tempdir().unwrap();
        let name = EnvName::parse("sf").unwrap();
        init_env_file(&Reward, dir.path(), &name, EnvType::Symfony, |_| Ok(true)).unwrap();
        assert!(dir.path().join(".reward/nginx").is_dir());
        assert!(!dir.path().join(".reward/varnish").exists());
    }

    #[test]
    fn test_stanza_pairs_skip_blank_lines() {
        let pairs = stanza_pairs("REWARD", EnvType::Magento2);
        assert!(pairs.contains(&("REWARD_ELASTICSEARCH".to_string(), "true".to_string())));
        assert!(pairs.contains(&("REWARD_SYNC_IGNORE".to_string(), String::new())));
        assert!(pairs.iter().all(|(k, _)| !k.is_empty()));
    }
}
