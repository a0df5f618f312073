//! Typed error kinds raised by the engine's leaf components
//!
//! Intermediate layers wrap these in `anyhow::Error` with operation context;
//! callers that need to branch on a kind use `downcast_ref::<EnvError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("unknown environment type '{given}' (valid types: {valid})")]
    UnknownEnvType { given: String, valid: String },

    #[error("invalid environment name '{0}': should match RFC1178 (letters, digits and '-', at most 63 characters, no leading or trailing '-')")]
    InvalidEnvName(String),

    #[error("environment is not initialized: {0}")]
    EnvEmpty(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container runtime is not available: {0}")]
    RuntimeUnavailable(String),

    #[error("{tool} version {found} is too old, at least {required} is required")]
    VersionTooOld {
        tool: String,
        found: String,
        required: String,
    },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("file already exists: {}", .0.display())]
    FileExistsBlocking(PathBuf),

    #[error("argument required: {0}")]
    ArgumentRequired(&'static str),

    #[error("unknown action '{0}' (expected connect or disconnect)")]
    UnknownAction(String),

    #[error("running as root is not allowed; set {0}=1 to override")]
    SuperuserForbidden(String),

    #[error("cannot render template {name}")]
    TemplateRender {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("cannot parse rendered template {name}")]
    FragmentParse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("command `{command}` failed with exit code {}", .code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    CommandFailed { command: String, code: Option<i32> },
}

impl EnvError {
    /// Process exit code for this error
    ///
    /// Subprocess failures propagate the child's code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            EnvError::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Exit code for any error chain, looking through anyhow context layers
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<EnvError>())
        .map(EnvError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_propagates_subprocess_code() {
        let err: anyhow::Result<()> = Err(EnvError::CommandFailed {
            command: "docker compose up".to_string(),
            code: Some(17),
        })
        .context("running env up");
        assert_eq!(exit_code(&err.unwrap_err()), 17);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        let err = anyhow::Error::new(EnvError::ArgumentRequired("db subcommand"));
        assert_eq!(exit_code(&err), 1);

        let err = anyhow::anyhow!("plain failure");
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_messages_mention_subject() {
        let err = EnvError::InvalidEnvName("-foo".to_string());
        assert!(err.to_string().contains("RFC1178"));

        let err = EnvError::VersionTooOld {
            tool: "docker".to_string(),
            found: "19.3.0".to_string(),
            required: "20.4.0".to_string(),
        };
        assert!(err.to_string().contains("20.4.0"));
    }
}
