//! Product configuration trait for the orchestrator binary
//!
//! The application name flows into every label, file name and parameter key
//! the engine produces (`dev.<app>.environment.name`, `<app>-sync=<env>`,
//! `.<app>/`, `<app>_env_name`), so it is defined once here.

/// Configuration trait for the product identity
///
/// Implementors define:
/// - Product identity (name, display name)
/// - The verb shown in place of the composition tool in help output
/// - Sync daemon download locations
/// - User agent for HTTP requests
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for labels, env-file keys, home directory)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// URL for product documentation
    fn docs_url(&self) -> &'static str;

    /// Pinned sync daemon archive, used where no package manager is available
    fn default_mutagen_url(&self) -> &'static str;

    /// Homebrew formula for the sync daemon
    fn mutagen_brew_formula(&self) -> &'static str {
        "mutagen-io/mutagen/mutagen"
    }

    /// Public verb replacing the composition tool's name in help output
    fn compose_verb(&self) -> String {
        format!("{} env", self.name())
    }

    /// File name of the user configuration file in the home directory
    fn config_file_name(&self) -> String {
        format!(".{}.yml", self.name())
    }

    /// Directory name for per-project overrides in the working directory
    fn project_dir_name(&self) -> String {
        format!(".{}", self.name())
    }

    /// Upper-cased prefix for env-file keys
    fn env_prefix(&self) -> String {
        self.name().to_uppercase()
    }

    /// Parameter key for `suffix` in the application namespace
    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.name(), suffix)
    }

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}

/// The reward product
#[derive(Debug, Clone, Copy, Default)]
pub struct Reward;

impl ProductConfig for Reward {
    fn name(&self) -> &'static str {
        "reward"
    }

    fn display_name(&self) -> &'static str {
        "Reward"
    }

    fn cli_description(&self) -> &'static str {
        "Local development environments for PHP projects"
    }

    fn docs_url(&self) -> &'static str {
        "https://rewardenv.readthedocs.io"
    }

    fn default_mutagen_url(&self) -> &'static str {
        "https://github.com/mutagen-io/mutagen/releases/download/v0.14.0/mutagen_windows_amd64_v0.14.0.zip"
    }

    fn user_agent(&self) -> &'static str {
        concat!("reward/", env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let app = Reward;
        assert_eq!(app.compose_verb(), "reward env");
        assert_eq!(app.config_file_name(), ".reward.yml");
        assert_eq!(app.project_dir_name(), ".reward");
        assert_eq!(app.env_prefix(), "REWARD");
        assert_eq!(app.key("env_name"), "reward_env_name");
    }
}
