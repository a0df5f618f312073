//! Parameter resolution
//!
//! `Params` holds every layer that feeds template rendering, highest
//! precedence first:
//!
//! 1. computed overrides (`set`)
//! 2. command-line flags
//! 3. project `.env`
//! 4. user configuration file (`~/.<app>.yml`)
//! 5. process environment
//! 6. env-type seed defaults
//! 7. built-in defaults (`set_default`)
//!
//! Keys are case-insensitive and stored lowercased.

pub mod derive;
pub mod loader;

pub use derive::{derive, HostInfo, HostOs};
pub use loader::Loader;

use serde_json::Value;
use std::collections::BTreeMap;

/// Tri-valued feature flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    Unset,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Override,
    Flag,
    DotEnv,
    UserConfig,
    Process,
    TypeSeed,
    Default,
}

impl Layer {
    const ORDER: [Layer; 7] = [
        Layer::Override,
        Layer::Flag,
        Layer::DotEnv,
        Layer::UserConfig,
        Layer::Process,
        Layer::TypeSeed,
        Layer::Default,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Boolean parsing with the usual textual spellings
///
/// Accepts `1/t/true/yes/on` and `0/f/false/no/off`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Coerce a parameter value to a boolean, if it looks like one
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Layered parameter store
#[derive(Debug, Clone, Default)]
pub struct Params {
    layers: [BTreeMap<String, Value>; 7],
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut BTreeMap<String, Value> {
        &mut self.layers[layer.index()]
    }

    /// Insert into a specific layer
    pub fn insert(&mut self, layer: Layer, key: &str, value: impl Into<Value>) {
        self.layer_mut(layer)
            .insert(key.to_lowercase(), value.into());
    }

    /// Set a computed value, overriding every other layer
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(Layer::Override, key, value);
    }

    /// Set a built-in default, consulted only when no other layer has the key
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(Layer::Default, key, value);
    }

    pub fn set_flag(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(Layer::Flag, key, value);
    }

    pub fn set_dotenv(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(Layer::DotEnv, key, value);
    }

    /// Snapshot the process environment into its layer
    pub fn with_process_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.insert(Layer::Process, k.as_ref(), Value::String(v.into()));
        }
        self
    }

    /// Layered lookup, highest precedence first
    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.to_lowercase();
        Layer::ORDER
            .iter()
            .find_map(|layer| self.layers[layer.index()].get(&key))
    }

    /// The layer a key currently resolves from
    pub fn source(&self, key: &str) -> Option<Layer> {
        let key = key.to_lowercase();
        Layer::ORDER
            .iter()
            .copied()
            .find(|layer| self.layers[layer.index()].contains_key(&key))
    }

    /// Whether anything other than a built-in default defines the key
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.source(key), Some(layer) if layer != Layer::Default)
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Boolean view of a key; missing or unparsable values are false
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(value_as_bool).unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Tri-valued view of a feature flag
    ///
    /// Empty strings count as unset so that `REWARD_FOO=` in an env-file does
    /// not switch a service off.
    pub fn flag(&self, key: &str) -> FlagState {
        match self.get(key) {
            None | Some(Value::Null) => FlagState::Unset,
            Some(Value::String(s)) if s.trim().is_empty() => FlagState::Unset,
            Some(v) => match value_as_bool(v) {
                Some(true) => FlagState::Enabled,
                _ => FlagState::Disabled,
            },
        }
    }

    /// Flattened view with every layer applied, for template rendering
    pub fn resolved(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        for layer in Layer::ORDER.iter().rev() {
            for (k, v) in &self.layers[layer.index()] {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }
}
