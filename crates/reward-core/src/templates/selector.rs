//! Fragment selection
//!
//! `select` turns an environment type, a parameter snapshot and a host OS
//! into the ordered list of fragments to render. It performs no I/O; the
//! order it returns is the override order the composition tool sees.

use crate::config::{HostOs, Params};
use crate::product::ProductConfig;
use crate::project::EnvType;

/// Services with their own fragment, in emission order
pub const SERVICES: [&str; 8] = [
    "php-fpm",
    "nginx",
    "db",
    "elasticsearch",
    "varnish",
    "rabbitmq",
    "redis",
    "node",
];

const ENVIRONMENTS_ROOT: &str = "templates/environments";

/// A selected fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Partial resolved through the includes and env-type directories
    Environment(String),
    /// User overlay, looked up in the project and home tiers only
    Overlay(String),
}

impl Fragment {
    /// Logical base name, as shown to users
    pub fn name(&self) -> &str {
        match self {
            Fragment::Environment(name) | Fragment::Overlay(name) => name,
        }
    }

    /// Template paths to request from the registry, in order
    ///
    /// Missing entries are skipped silently by the caller.
    pub fn template_paths(&self, env_type: EnvType, os: HostOs) -> Vec<String> {
        match self {
            Fragment::Environment(partial) => {
                let mut paths = Vec::with_capacity(4);
                for dir in ["includes", env_type.as_str()] {
                    paths.push(format!("{}/{}/{}.base.yml", ENVIRONMENTS_ROOT, dir, partial));
                    paths.push(format!("{}/{}/{}.{}.yml", ENVIRONMENTS_ROOT, dir, partial, os));
                }
                paths
            }
            Fragment::Overlay(name) => vec![name.clone()],
        }
    }
}

fn flag_key<C: ProductConfig>(config: &C, svc: &str) -> String {
    config.key(&svc.replace('-', "_"))
}

/// Select the fragments for an environment
pub fn select<C: ProductConfig>(
    config: &C,
    env_type: EnvType,
    params: &Params,
    os: HostOs,
) -> Vec<Fragment> {
    let t = env_type.as_str();
    let enabled = |flag: &str| params.get_bool(&flag_key(config, flag));
    let mut out = vec![Fragment::Environment("networks".to_string())];

    for svc in SERVICES {
        if enabled(svc) {
            out.push(Fragment::Environment(svc.to_string()));
        }
    }

    out.push(Fragment::Environment(t.to_string()));

    for (flag, partial) in [
        ("test_db", format!("{}.tests", t)),
        ("split_sales", format!("{}.splitdb.sales", t)),
        ("split_checkout", format!("{}.splitdb.checkout", t)),
    ] {
        if enabled(flag) {
            out.push(Fragment::Environment(partial));
        }
    }

    let cross_cutting: [(&str, Vec<String>); 4] = [
        ("blackfire", vec!["blackfire".to_string(), format!("{}.blackfire", t)]),
        ("allure", vec!["allure".to_string()]),
        ("selenium", vec!["selenium".to_string()]),
        ("magepack", vec![format!("{}.magepack", t)]),
    ];
    for (flag, partials) in cross_cutting {
        if enabled(flag) {
            out.extend(partials.into_iter().map(Fragment::Environment));
        }
    }

    out.push(Fragment::Overlay(format!("{}-env.yml", config.name())));
    out.push(Fragment::Overlay(format!("{}-env.{}.yml", config.name(), os)));

    out
}
