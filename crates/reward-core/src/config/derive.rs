//! Computed parameters applied before fragment selection

use super::{Layer, Params};
use crate::project::{seed, EnvType};
use crate::product::ProductConfig;
use std::fmt;
use tracing::debug;

/// Host operating system, as far as composition is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            HostOs::Darwin
        } else if cfg!(windows) {
            HostOs::Windows
        } else {
            HostOs::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::Darwin => "darwin",
            HostOs::Windows => "windows",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host facts the derivations depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    pub os: HostOs,
    /// Effective uid; `None` where the concept does not apply
    pub euid: Option<u32>,
}

impl HostInfo {
    pub fn detect() -> Self {
        let os = HostOs::current();
        let euid = match os {
            HostOs::Windows => None,
            _ => crate::runtime::check::effective_uid(),
        };
        Self { os, euid }
    }
}

const PWA_DISABLED: [&str; 7] = [
    "db",
    "nginx",
    "php_fpm",
    "redis",
    "varnish",
    "elasticsearch",
    "rabbitmq",
];

const NON_LOCAL_ENABLED: [&str; 4] = ["php_fpm", "nginx", "db", "redis"];

/// Flags that switch fragments on or off
///
/// Stored back as booleans after derivation so that templates testing a flag
/// and the selector emitting its fragment always agree.
pub const FRAGMENT_SWITCHES: [&str; 16] = [
    "php_fpm",
    "nginx",
    "db",
    "elasticsearch",
    "varnish",
    "rabbitmq",
    "redis",
    "node",
    "test_db",
    "split_sales",
    "split_checkout",
    "blackfire",
    "allure",
    "selenium",
    "selenium_debug",
    "magepack",
];

/// Whether host-to-container file sync replaces bind mounts on this host
pub fn sync_active<C: ProductConfig>(config: &C, params: &Params, os: HostOs) -> bool {
    match os {
        HostOs::Darwin => true,
        HostOs::Windows => !params.get_bool(&config.key("wsl2_direct_mount")),
        HostOs::Linux => false,
    }
}

/// Apply type seeds, default enablement and host-dependent values
pub fn derive<C: ProductConfig>(
    config: &C,
    params: &mut Params,
    env_type: EnvType,
    host: &HostInfo,
) {
    for (k, v) in seed::stanza_pairs(&config.env_prefix(), env_type) {
        params.insert(Layer::TypeSeed, &k, v);
    }

    let key = |s: &str| config.key(s);

    if env_type.is_pwa_studio() {
        if !params.is_set(&key("node")) {
            params.set(&key("node"), true);
        }
        for svc in PWA_DISABLED {
            if !params.is_set(&key(svc)) {
                params.set(&key(svc), false);
            }
        }
    } else {
        for svc in NON_LOCAL_ENABLED {
            if !params.is_set(&key(svc)) {
                params.set(&key(svc), true);
            }
        }
    }

    for switch in FRAGMENT_SWITCHES {
        let on = params.get_bool(&key(switch));
        params.set(&key(switch), on);
    }

    if env_type.has_php_variant() {
        let variant = if params.get_bool(&key("single_web_container")) {
            format!("-{}-web", env_type)
        } else {
            format!("-{}", env_type)
        };
        params.set(&key("svc_php_variant"), variant);
        params.set(&key("svc_php_debug_variant"), format!("-{}", env_type));
    }
    debug!(
        variant = %params.get_string(&key("svc_php_variant")),
        "php variant"
    );

    let (sync_container, sync_path) = if env_type.is_pwa_studio() {
        ("node", "/usr/src/app")
    } else {
        ("php-fpm", "/var/www/html")
    };
    params.set_default(&key("sync_container"), sync_container);
    params.set_default(&key("sync_path"), sync_path);
    let sync_enabled = sync_active(config, params, host.os);
    params.set(&key("sync_enabled"), sync_enabled);

    if host.os == HostOs::Windows && !params.is_set("xdebug_connect_back_host") {
        params.set("xdebug_connect_back_host", "host.docker.internal");
    }

    if host.os == HostOs::Linux
        && host.euid == Some(1000)
        && !params.is_set("ssh_auth_sock_path_env")
    {
        params.set("ssh_auth_sock_path_env", "/run/host-services/ssh-auth.sock");
    }

    let suffix = if params.get_bool(&key("selenium_debug")) {
        "-debug"
    } else {
        ""
    };
    params.set(&key("selenium_debug_suffix"), suffix);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Reward;

    fn linux() -> HostInfo {
        HostInfo {
            os: HostOs::Linux,
            euid: Some(501),
        }
    }

    #[test]
    fn test_magento2_defaults() {
        let mut params = Params::new();
        derive(&Reward, &mut params, EnvType::Magento2, &linux());
        for svc in ["php_fpm", "nginx", "db", "redis", "elasticsearch", "varnish", "rabbitmq"] {
            assert!(params.get_bool(&format!("reward_{}", svc)), "{}", svc);
        }
        assert!(!params.get_bool("reward_node"));
        assert_eq!(params.get_string("reward_svc_php_variant"), "-magento2");
        assert_eq!(params.get_string("reward_sync_container"), "php-fpm");
        assert!(!params.get_bool("reward_sync_enabled"));
    }

    #[test]
    fn test_pwa_defaults_respect_explicit_flags() {
        let mut params = Params::new();
        params.set_dotenv("REWARD_REDIS", "true");
        derive(&Reward, &mut params, EnvType::PwaStudio, &linux());
        assert!(params.get_bool("reward_node"));
        assert!(params.get_bool("reward_redis"));
        assert!(!params.get_bool("reward_db"));
        assert!(!params.get_bool("reward_php_fpm"));
        assert_eq!(params.get_string("reward_sync_container"), "node");
        assert_eq!(params.get_string("reward_sync_path"), "/usr/src/app");
        assert_eq!(params.get_string("reward_svc_php_variant"), "");
    }

    #[test]
    fn test_single_web_container_variant() {
        let mut params = Params::new();
        params.set_dotenv("REWARD_SINGLE_WEB_CONTAINER", "1");
        derive(&Reward, &mut params, EnvType::Shopware, &linux());
        assert_eq!(params.get_string("reward_svc_php_variant"), "-shopware-web");
        assert_eq!(params.get_string("reward_svc_php_debug_variant"), "-shopware");
    }

    #[test]
    fn test_host_specific_values() {
        let mut params = Params::new();
        derive(
            &Reward,
            &mut params,
            EnvType::Laravel,
            &HostInfo {
                os: HostOs::Windows,
                euid: None,
            },
        );
        assert_eq!(
            params.get_string("xdebug_connect_back_host"),
            "host.docker.internal"
        );
        assert!(params.get_bool("reward_sync_enabled"));

        let mut params = Params::new();
        derive(
            &Reward,
            &mut params,
            EnvType::Laravel,
            &HostInfo {
                os: HostOs::Linux,
                euid: Some(1000),
            },
        );
        assert_eq!(
            params.get_string("ssh_auth_sock_path_env"),
            "/run/host-services/ssh-auth.sock"
        );

        let mut params = Params::new();
        params.set_dotenv("SSH_AUTH_SOCK_PATH_ENV", "/custom.sock");
        derive(
            &Reward,
            &mut params,
            EnvType::Laravel,
            &HostInfo {
                os: HostOs::Linux,
                euid: Some(1000),
            },
        );
        assert_eq!(params.get_string("ssh_auth_sock_path_env"), "/custom.sock");
    }

    #[test]
    fn test_sync_activation() {
        let mut params = Params::new();
        assert!(sync_active(&Reward, &params, HostOs::Darwin));
        assert!(sync_active(&Reward, &params, HostOs::Windows));
        assert!(!sync_active(&Reward, &params, HostOs::Linux));
        params.set_dotenv("REWARD_WSL2_DIRECT_MOUNT", "1");
        assert!(!sync_active(&Reward, &params, HostOs::Windows));
    }

    #[test]
    fn test_fragment_switches_are_explicit_booleans() {
        let mut params = Params::new();
        params.set_dotenv("REWARD_BLACKFIRE", "yes");
        derive(&Reward, &mut params, EnvType::Laravel, &linux());
        let resolved = params.resolved();
        assert_eq!(resolved.get("reward_varnish"), Some(&serde_json::json!(false)));
        assert_eq!(resolved.get("reward_node"), Some(&serde_json::json!(false)));
        assert_eq!(resolved.get("reward_nginx"), Some(&serde_json::json!(true)));
        assert_eq!(resolved.get("reward_blackfire"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_selenium_debug_suffix() {
        let mut params = Params::new();
        params.set_dotenv("REWARD_SELENIUM_DEBUG", "true");
        derive(&Reward, &mut params, EnvType::Magento2, &linux());
        assert_eq!(params.get_string("reward_selenium_debug_suffix"), "-debug");
    }
}
