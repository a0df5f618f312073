//! Reward Core - environment composition engine for containerised PHP projects
//!
//! This library turns a project's env-file and the user's configuration into
//! a composition plan, runs it through `docker compose`, keeps shared
//! infrastructure containers attached to project networks, and supervises
//! host-to-container file sync where bind mounts are slow.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Composition** - `config` (parameter layers), `project`,
//!   `templates` (registry, selector, renderer) and `plan`
//! - **Layer 2: Drivers** - `runtime` (docker, compose, version gates, tool
//!   installation) and `sync` (mutagen and the session supervisor), behind
//!   traits so command flows can run against fakes
//! - **Layer 3: Commands** - `commands::Orchestrator` sequencing the layers per
//!   subcommand, plus optional cliclack prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompts module

pub mod commands;
pub mod config;
pub mod error;
pub mod peered;
pub mod plan;
pub mod product;
pub mod project;
pub mod runtime;
pub mod sync;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::Orchestrator;
pub use config::{HostInfo, HostOs, Loader, Params};
pub use error::{exit_code, EnvError};
pub use plan::TempFiles;
pub use product::{ProductConfig, Reward};
pub use project::{EnvName, EnvType, Project};
