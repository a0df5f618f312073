//! In-memory stand-ins for the external tools, sharing one ordered journal

use crate::error::EnvError;
use crate::runtime::{ComposeRunner, ContainerRuntime, ContainerSummary, IoMode, NetworkSummary};
use crate::sync::mutagen::create_args;
use crate::sync::{SessionSpec, SyncTool};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// Ordered record of mutating calls across every fake
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    name: String,
    state: String,
    labels: Vec<String>,
}

#[derive(Debug, Default)]
struct RuntimeState {
    containers: Vec<FakeContainer>,
    networks: BTreeMap<String, Vec<String>>,
    attachments: BTreeMap<String, Vec<String>>,
    addresses: BTreeMap<(String, String), String>,
}

#[derive(Debug, Clone)]
pub struct FakeRuntime {
    journal: Journal,
    state: Arc<Mutex<RuntimeState>>,
}

impl FakeRuntime {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Arc::default(),
        }
    }

    pub fn with_container(self, name: &str, id: &str) -> Self {
        self.state.lock().unwrap().containers.push(FakeContainer {
            id: id.to_string(),
            name: name.to_string(),
            state: "running".to_string(),
            labels: Vec::new(),
        });
        self
    }

    pub fn with_labeled(self, id: &str, labels: &[&str]) -> Self {
        self.state.lock().unwrap().containers.push(FakeContainer {
            id: id.to_string(),
            name: id.to_string(),
            state: "running".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        self
    }

    /// Add labels to an existing container
    pub fn with_labels(self, id: &str, labels: &[&str]) -> Self {
        for c in self.state.lock().unwrap().containers.iter_mut() {
            if c.id == id {
                c.labels.extend(labels.iter().map(|l| l.to_string()));
            }
        }
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        self.create_network(name, &[]);
        self
    }

    pub fn with_labeled_network(self, name: &str, label: &str) -> Self {
        self.create_network(name, &[label]);
        self
    }

    pub fn with_address(self, id: &str, network: &str, ip: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .addresses
            .insert((id.to_string(), network.to_string()), ip.to_string());
        self
    }

    pub fn create_network(&self, name: &str, labels: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .networks
            .entry(name.to_string())
            .or_insert_with(|| labels.iter().map(|l| l.to_string()).collect());
    }

    /// Replace a container's id, as a recreated container would get
    pub fn relabel(&self, old: &str, new: &str) {
        for c in self.state.lock().unwrap().containers.iter_mut() {
            if c.id == old {
                c.id = new.to_string();
            }
        }
    }

    pub fn set_state(&self, id: &str, state: &str) {
        for c in self.state.lock().unwrap().containers.iter_mut() {
            if c.id == id {
                c.state = state.to_string();
            }
        }
    }

    pub fn attached(&self, network: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .get(network)
            .cloned()
            .unwrap_or_default()
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn version(&self) -> Result<String> {
        Ok("24.0.2".to_string())
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().networks.contains_key(name))
    }

    async fn networks_by_label(&self, label: &str) -> Result<Vec<NetworkSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .networks
            .iter()
            .filter(|(_, labels)| labels.iter().any(|l| l == label || l.starts_with(&format!("{}=", label))))
            .map(|(name, _)| NetworkSummary {
                id: format!("id-{}", name),
                name: name.clone(),
            })
            .collect())
    }

    async fn containers_by_name(&self, name: &str) -> Result<Vec<ContainerSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .filter(|c| c.name == name)
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                state: c.state.clone(),
            })
            .collect())
    }

    async fn container_id_by_label(&self, labels: &[String]) -> Result<String> {
        let state = self.state.lock().unwrap();
        let matches: Vec<_> = state
            .containers
            .iter()
            .filter(|c| labels.iter().all(|l| c.labels.contains(l)))
            .collect();
        match matches.as_slice() {
            [only] => Ok(only.id.clone()),
            _ => Err(EnvError::ContainerNotFound(labels.join(", ")).into()),
        }
    }

    async fn container_state(&self, id: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.state.clone())
            .ok_or_else(|| EnvError::ContainerNotFound(id.to_string()).into())
    }

    async fn container_address(&self, id: &str, network: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .addresses
            .get(&(id.to_string(), network.to_string()))
            .cloned())
    }

    async fn network_connect(&self, network: &str, container: &str, aliases: &[String]) -> Result<()> {
        let mut entry = String::from("docker network connect");
        for alias in aliases {
            entry.push_str(&format!(" --alias {}", alias));
        }
        self.journal.push(format!("{} {} {}", entry, network, container));

        let mut state = self.state.lock().unwrap();
        if !state.networks.contains_key(network) {
            return Err(anyhow!("network {} not found", network));
        }
        let attached = state.attachments.entry(network.to_string()).or_default();
        if attached.iter().any(|c| c == container) {
            return Err(anyhow!("endpoint with name {} already exists in network {}", container, network));
        }
        attached.push(container.to_string());
        Ok(())
    }

    async fn network_disconnect(&self, network: &str, container: &str) -> Result<()> {
        self.journal
            .push(format!("docker network disconnect {} {}", network, container));

        let mut state = self.state.lock().unwrap();
        let attached = state.attachments.entry(network.to_string()).or_default();
        let before = attached.len();
        attached.retain(|c| c != container);
        if attached.len() == before {
            return Err(anyhow!("container {} is not connected to {}", container, network));
        }
        Ok(())
    }
}

/// Drop the wiring added by the plan (`--project-directory`, `--project-name`, `-f`)
pub fn strip_wiring(argv: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        if matches!(arg.as_str(), "--project-directory" | "--project-name" | "-f") {
            iter.next();
            continue;
        }
        out.push(arg.clone());
    }
    out
}

#[derive(Debug, Clone)]
pub struct FakeCompose {
    journal: Journal,
    /// Network created by `up`, in the given runtime
    creates: Option<(FakeRuntime, String)>,
    argvs: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeCompose {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            creates: None,
            argvs: Arc::default(),
        }
    }

    pub fn creating_network(mut self, runtime: &FakeRuntime, network: &str) -> Self {
        self.creates = Some((runtime.clone(), network.to_string()));
        self
    }

    /// Full argument vectors received, wiring included
    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.argvs.lock().unwrap().clone()
    }
}

impl ComposeRunner for FakeCompose {
    async fn version(&self) -> Result<String> {
        Ok("2.20.2".to_string())
    }

    async fn run(&self, argv: &[String], _mode: IoMode) -> Result<String> {
        self.argvs.lock().unwrap().push(argv.to_vec());
        let args = strip_wiring(argv);
        self.journal
            .push(format!("docker compose {}", args.join(" ")).trim_end().to_string());

        if args.first().map(String::as_str) == Some("up") {
            if let Some((runtime, network)) = &self.creates {
                runtime.create_network(network, &[]);
            }
        }
        Ok(String::new())
    }
}

#[derive(Debug, Default)]
struct SyncState {
    sessions: BTreeMap<String, SessionSpec>,
    paused: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct FakeSync {
    journal: Journal,
    state: Arc<Mutex<SyncState>>,
    failure: Option<String>,
}

impl FakeSync {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Arc::default(),
            failure: None,
        }
    }

    /// Sessions report `line` instead of becoming ready
    pub fn failing(mut self, line: &str) -> Self {
        self.failure = Some(line.to_string());
        self
    }

    pub fn listing(&self, label: &str) -> String {
        let state = self.state.lock().unwrap();
        let Some(spec) = state.sessions.get(label) else {
            return String::new();
        };
        let status = match (&self.failure, state.paused.contains(label)) {
            (Some(line), _) => line.clone(),
            (None, true) => "Status: [Paused]".to_string(),
            (None, false) => "Status: Watching for changes".to_string(),
        };
        format!(
            "Name: {0}\nLabels:\n\t{0}\nAlpha:\n\tURL: {1}\nBeta:\n\tURL: {2}\n{3}\n",
            spec.label, spec.alpha, spec.beta, status
        )
    }

    fn record(&self, verb: &str, label: &str) {
        self.journal.push(format!("mutagen sync {} {}", verb, label));
    }
}

impl SyncTool for FakeSync {
    async fn version(&self) -> Result<String> {
        Ok("0.11.8".to_string())
    }

    async fn create(&self, spec: &SessionSpec) -> Result<()> {
        self.journal.push(format!("mutagen {}", create_args(spec).join(" ")));
        self.state
            .lock()
            .unwrap()
            .sessions
            .insert(spec.label.clone(), spec.clone());
        Ok(())
    }

    async fn list(&self, label: &str) -> Result<String> {
        Ok(self.listing(label))
    }

    async fn terminate(&self, label: &str) -> Result<()> {
        self.record("terminate", label);
        let mut state = self.state.lock().unwrap();
        state.sessions.remove(label);
        state.paused.remove(label);
        Ok(())
    }

    async fn pause(&self, label: &str) -> Result<()> {
        self.record("pause", label);
        self.state.lock().unwrap().paused.insert(label.to_string());
        Ok(())
    }

    async fn resume(&self, label: &str) -> Result<()> {
        self.record("resume", label);
        self.state.lock().unwrap().paused.remove(label);
        Ok(())
    }

    async fn flush(&self, label: &str) -> Result<()> {
        self.record("flush", label);
        Ok(())
    }

    async fn reset(&self, label: &str) -> Result<()> {
        self.record("reset", label);
        Ok(())
    }

    async fn monitor(&self, label: &str) -> Result<()> {
        self.record("monitor", label);
        Ok(())
    }
}
