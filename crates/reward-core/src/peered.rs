//! Attachment of shared infrastructure containers to project networks
//!
//! The roster is applied best-effort: each member is attached or detached on
//! its own and failures are collected rather than aborting the pass. A second
//! `connect` with the same inputs only produces soft errors for members that
//! are already attached.

use crate::config::{FlagState, Params};
use crate::error::EnvError;
use crate::product::ProductConfig;
use crate::project::ProjectDomain;
use crate::runtime::ContainerRuntime;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAction {
    Connect,
    Disconnect,
}

impl FromStr for PeerAction {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(PeerAction::Connect),
            "disconnect" => Ok(PeerAction::Disconnect),
            other => Err(EnvError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for PeerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAction::Connect => write!(f, "connect"),
            PeerAction::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// When a shared service belongs on the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inclusion {
    Always,
    /// Unless explicitly disabled
    Permissive,
    /// Only if explicitly enabled
    Strict,
}

const SHARED_SERVICES: [(&str, Inclusion); 6] = [
    ("traefik", Inclusion::Always),
    ("tunnel", Inclusion::Permissive),
    ("mailhog", Inclusion::Permissive),
    ("phpmyadmin", Inclusion::Permissive),
    ("elastichq", Inclusion::Permissive),
    ("adminer", Inclusion::Strict),
];

/// A shared service and the DNS aliases it gets on the project network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMember {
    pub service: String,
    pub aliases: Vec<String>,
}

/// Compute the roster for the current parameters
///
/// Traefik answers for the project's domains when domain resolution is on
/// and a domain is known.
pub fn roster<C: ProductConfig>(
    config: &C,
    params: &Params,
    domain: Option<&ProjectDomain>,
) -> Vec<PeerMember> {
    let mut members = Vec::new();
    for (service, inclusion) in SHARED_SERVICES {
        let state = params.flag(&config.key(service));
        let include = match inclusion {
            Inclusion::Always => true,
            Inclusion::Permissive => state != FlagState::Disabled,
            Inclusion::Strict => state == FlagState::Enabled,
        };
        if !include {
            continue;
        }

        let mut aliases = Vec::new();
        if service == "traefik" && params.get_bool(&config.key("resolve_domain_to_traefik")) {
            if let Some(domain) = domain.filter(|d| !d.domain.is_empty()) {
                aliases.push(domain.domain.clone());
                aliases.push(domain.full_domain());
            }
        }
        members.push(PeerMember {
            service: service.to_string(),
            aliases,
        });
    }
    members
}

/// Result of applying the action to one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerOutcome {
    pub service: String,
    pub container: String,
    pub error: Option<String>,
}

impl PeerOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Apply `action` for every roster member against `network`
///
/// Lookup and attach failures are logged at debug level and reported in the
/// returned outcomes; they never fail the pass.
pub async fn apply<R: ContainerRuntime>(
    runtime: &R,
    action: PeerAction,
    network: &str,
    roster: &[PeerMember],
) -> Vec<PeerOutcome> {
    let mut outcomes = Vec::new();
    for member in roster {
        let containers = match runtime.containers_by_name(&member.service).await {
            Ok(containers) => containers,
            Err(e) => {
                debug!(service = %member.service, error = %format!("{:#}", e), "cannot list containers");
                outcomes.push(PeerOutcome {
                    service: member.service.clone(),
                    container: String::new(),
                    error: Some(format!("{:#}", e)),
                });
                continue;
            }
        };

        for container in containers {
            let result = match action {
                PeerAction::Connect => {
                    runtime
                        .network_connect(network, &container.id, &member.aliases)
                        .await
                }
                PeerAction::Disconnect => runtime.network_disconnect(network, &container.id).await,
            };
            let error = result.err().map(|e| format!("{:#}", e));
            if let Some(error) = &error {
                debug!(%action, %network, container = %container.name, %error, "peered network");
            }
            outcomes.push(PeerOutcome {
                service: member.service.clone(),
                container: container.name,
                error,
            });
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Reward;
    use crate::testing::{FakeRuntime, Journal};

    fn defaults() -> Params {
        let mut params = Params::new();
        for svc in ["tunnel", "mailhog", "phpmyadmin", "elastichq"] {
            params.set_default(&format!("reward_{}", svc), true);
        }
        params.set_default("reward_resolve_domain_to_traefik", true);
        params
    }

    fn foo_domain() -> ProjectDomain {
        ProjectDomain {
            domain: "foo.test".to_string(),
            subdomain: String::new(),
        }
    }

    fn services(roster: &[PeerMember]) -> Vec<&str> {
        roster.iter().map(|m| m.service.as_str()).collect()
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("connect".parse::<PeerAction>().unwrap(), PeerAction::Connect);
        assert_eq!("disconnect".parse::<PeerAction>().unwrap(), PeerAction::Disconnect);
        assert!(matches!(
            "attach".parse::<PeerAction>(),
            Err(EnvError::UnknownAction(a)) if a == "attach"
        ));
    }

    #[test]
    fn test_default_roster() {
        let roster = roster(&Reward, &defaults(), Some(&foo_domain()));
        assert_eq!(
            services(&roster),
            vec!["traefik", "tunnel", "mailhog", "phpmyadmin", "elastichq"]
        );
        assert_eq!(roster[0].aliases, vec!["foo.test", "foo.test"]);
        assert!(roster[1].aliases.is_empty());
    }

    #[test]
    fn test_roster_flags() {
        let mut params = defaults();
        params.set_dotenv("REWARD_MAILHOG", "false");
        params.set_dotenv("REWARD_ADMINER", "1");
        params.set_dotenv("REWARD_RESOLVE_DOMAIN_TO_TRAEFIK", "0");
        let domain = ProjectDomain {
            domain: "foo.test".to_string(),
            subdomain: "app".to_string(),
        };
        let roster = roster(&Reward, &params, Some(&domain));
        assert_eq!(
            services(&roster),
            vec!["traefik", "tunnel", "phpmyadmin", "elastichq", "adminer"]
        );
        assert!(roster[0].aliases.is_empty());

        params.set_dotenv("REWARD_RESOLVE_DOMAIN_TO_TRAEFIK", "1");
        let roster = super::roster(&Reward, &params, Some(&domain));
        assert_eq!(roster[0].aliases, vec!["foo.test", "app.foo.test"]);
    }

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let journal = Journal::default();
        let runtime = FakeRuntime::new(journal.clone())
            .with_container("traefik", "t1")
            .with_container("tunnel", "t2")
            .with_network("foo_default");
        let roster = roster(&Reward, &defaults(), Some(&foo_domain()));

        let outcomes = apply(&runtime, PeerAction::Connect, "foo_default", &roster).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(PeerOutcome::is_ok));
        assert_eq!(
            runtime.attached("foo_default"),
            vec!["t1".to_string(), "t2".to_string()]
        );

        let again = apply(&runtime, PeerAction::Connect, "foo_default", &roster).await;
        assert!(again.iter().all(|o| !o.is_ok()));
        assert_eq!(runtime.attached("foo_default").len(), 2);

        apply(&runtime, PeerAction::Disconnect, "foo_default", &roster).await;
        assert!(runtime.attached("foo_default").is_empty());
        assert_eq!(
            journal.entries()[0],
            "docker network connect --alias foo.test --alias foo.test foo_default t1"
        );
    }
}
