//! Template rendering with Tera
//!
//! Templates get Tera's standard filters plus a truthiness helper, usable as a
//! test (`{% if reward_varnish is enabled %}`) or a function
//! (`{{ isEnabled(v=reward_varnish) }}`).

use super::registry::{FragmentTemplate, TemplateRegistry};
use crate::config::Params;
use crate::error::EnvError;
use anyhow::{Context as _, Result};
use std::collections::HashMap;
use tera::{Context, Tera, Value};
use tracing::debug;

/// Truthiness used by templates
///
/// `true`, `1`, `"1"` and `"true"` are enabled and any other concrete value is
/// not. A missing or null value counts as enabled, so switches that were never
/// configured stay on.
pub fn is_enabled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s == "1" || s == "true",
        Some(_) => false,
    }
}

fn enabled_tester(value: Option<&Value>, _args: &[Value]) -> tera::Result<bool> {
    Ok(is_enabled(value))
}

fn enabled_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::Bool(is_enabled(args.get("v"))))
}

/// A rendered fragment ready for parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub name: String,
    pub document: String,
}

/// Ordered, de-duplicated set of templates sharing one Tera instance
pub struct TemplateSet {
    tera: Tera,
    order: Vec<String>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSet {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_tester("enabled", enabled_tester);
        tera.register_function("isEnabled", enabled_function);
        Self {
            tera,
            order: Vec::new(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }

    /// Parse and append a template; a name seen before is skipped
    pub fn add(&mut self, template: &FragmentTemplate) -> Result<bool> {
        if self.contains(&template.name) {
            debug!(template = %template.name, "template already defined, skipping");
            return Ok(false);
        }
        self.tera
            .add_raw_template(&template.name, &template.text)
            .map_err(|source| EnvError::TemplateRender {
                name: template.name.clone(),
                source,
            })?;
        debug!(template = %template.name, tier = %template.tier, "template added");
        self.order.push(template.name.clone());
        Ok(true)
    }

    /// Look up each path in the registry and append what exists
    pub fn append_from(&mut self, registry: &TemplateRegistry, paths: &[String]) -> Result<()> {
        for path in paths {
            if self.contains(path) {
                continue;
            }
            if let Some(template) = registry.lookup(path)? {
                self.add(&template)?;
            }
        }
        Ok(())
    }

    /// Like `append_from` but only the project and home tiers are consulted
    pub fn append_user_from(&mut self, registry: &TemplateRegistry, paths: &[String]) -> Result<()> {
        for path in paths {
            if self.contains(path) {
                continue;
            }
            if let Some(template) = registry.lookup_user(path)? {
                self.add(&template)?;
            }
        }
        Ok(())
    }

    /// Render every template in insertion order
    pub fn render_all(&self, context: &Context) -> Result<Vec<RenderedFragment>> {
        self.order
            .iter()
            .map(|name| self.render(name, context))
            .collect()
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<RenderedFragment> {
        let document = self
            .tera
            .render(name, context)
            .map_err(|source| EnvError::TemplateRender {
                name: name.to_string(),
                source,
            })?;
        Ok(RenderedFragment {
            name: name.to_string(),
            document,
        })
    }
}

/// Build the rendering context from resolved parameters
pub fn context(params: &Params) -> Result<Context> {
    Context::from_serialize(params.resolved()).context("Failed to build template context")
}

/// Render a single template text outside of a set
pub fn render_text(name: &str, text: &str, params: &Params) -> Result<String> {
    let mut set = TemplateSet::new();
    set.add(&FragmentTemplate {
        name: name.to_string(),
        tier: super::registry::Tier::Embedded,
        text: text.to_string(),
    })?;
    Ok(set.render(name, &context(params)?)?.document)
}
