//! Sync daemon installation
//!
//! The sync binary is looked up in PATH; when missing it is installed with
//! Homebrew (macOS, streamed output) or downloaded as a pinned zip archive
//! next to the running executable (Windows).

use crate::config::HostOs;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;
use url::Url;
use zip::ZipArchive;

/// Homebrew builds can take a while on a cold tap
const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for a CLI tool
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Name of the tool binary (e.g., "mutagen")
    pub name: &'static str,
    /// Display name for user-facing messages
    pub display_name: &'static str,
    /// Homebrew formula
    pub brew_formula: &'static str,
    /// Pinned archive for hosts without a package manager
    pub download_url: String,
    /// URL to the documentation
    pub docs_url: &'static str,
    pub user_agent: &'static str,
}

/// How the tool gets installed on this host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMethod {
    Brew,
    Download,
    Manual,
}

impl InstallMethod {
    pub fn for_os(os: HostOs) -> Self {
        match os {
            HostOs::Darwin => InstallMethod::Brew,
            HostOs::Windows => InstallMethod::Download,
            HostOs::Linux => InstallMethod::Manual,
        }
    }
}

/// Manager for checking and installing CLI tools
pub struct ToolManager {
    config: ToolConfig,
}

impl ToolManager {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Check if the tool is installed and available in PATH
    pub fn is_installed(&self) -> bool {
        which::which(self.config.name).is_ok()
    }

    /// Get the installed tool version (if available)
    pub async fn get_version(&self) -> Option<String> {
        let output = super::capture(self.config.name, &["version"]).await.ok()?;
        output
            .success()
            .then(|| output.stdout.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Human-readable install instruction for `method`
    pub fn install_command(&self, method: &InstallMethod) -> String {
        match method {
            InstallMethod::Brew => format!("brew install {}", self.config.brew_formula),
            InstallMethod::Download => format!("download {}", self.config.download_url),
            InstallMethod::Manual => format!(
                "install {} manually, see {}",
                self.config.display_name, self.config.docs_url
            ),
        }
    }

    pub async fn install(&self, method: &InstallMethod) -> Result<()> {
        match method {
            InstallMethod::Brew => self.brew_install().await,
            InstallMethod::Download => {
                let exe = std::env::current_exe().context("Cannot locate the running executable")?;
                let dir = exe
                    .parent()
                    .context("Executable has no parent directory")?
                    .to_path_buf();
                self.download_to(&dir).await.map(|_| ())
            }
            InstallMethod::Manual => anyhow::bail!(
                "{} is required: {}",
                self.config.display_name,
                self.install_command(method)
            ),
        }
    }

    /// Install with Homebrew, streaming its output
    async fn brew_install(&self) -> Result<()> {
        let cmd = self.install_command(&InstallMethod::Brew);
        eprintln!();
        eprintln!("{} {}", "Running:".dimmed(), cmd.yellow());
        eprintln!();

        let mut child = TokioCommand::new("brew")
            .arg("install")
            .arg(self.config.brew_formula)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to run brew")?;

        let stdout = child.stdout.take().context("Failed to capture stdout")?;
        let stderr = child.stderr.take().context("Failed to capture stderr")?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let output_task = async {
            let mut stderr_open = true;
            loop {
                tokio::select! {
                    line = stdout_reader.next_line() => {
                        match line {
                            Ok(Some(line)) => eprintln!("  {}", line),
                            Ok(None) => break,
                            Err(e) => {
                                eprintln!("{} {}", "Error reading stdout:".red(), e);
                                break;
                            }
                        }
                    }
                    line = stderr_reader.next_line(), if stderr_open => {
                        match line {
                            Ok(Some(line)) => eprintln!("  {}", line.yellow()),
                            Ok(None) => stderr_open = false,
                            Err(e) => {
                                eprintln!("{} {}", "Error reading stderr:".red(), e);
                                stderr_open = false;
                            }
                        }
                    }
                }
            }
        };

        if timeout(INSTALL_TIMEOUT, output_task).await.is_err() {
            let _ = child.kill().await;
            anyhow::bail!(
                "Installation timed out after {} seconds. Please install manually:\n{}",
                INSTALL_TIMEOUT.as_secs(),
                cmd
            );
        }

        let status = child.wait().await.context("Failed to wait for brew")?;
        eprintln!();
        if !status.success() {
            anyhow::bail!(
                "Installation failed with exit code: {}\nPlease try installing manually: {}",
                status.code().unwrap_or(-1),
                cmd
            );
        }
        Ok(())
    }

    /// Download the pinned archive and unpack it into `dir`
    pub async fn download_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let url = Url::parse(&self.config.download_url)
            .with_context(|| format!("Invalid download URL: {}", self.config.download_url))?;
        eprintln!("{} {}", "Downloading:".dimmed(), url.as_str().yellow());

        let client = reqwest::Client::builder()
            .user_agent(self.config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let response = client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download {}: HTTP {}", url, response.status());
        }
        let bytes = response.bytes().await?;

        extract_zip(&bytes, dir)
    }
}

/// Unpack every file of a zip archive under `dir`
pub fn extract_zip(zip_bytes: &[u8], dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archive =
        ZipArchive::new(Cursor::new(zip_bytes)).context("Failed to read zip archive")?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let Some(relative) = file.enclosed_name() else {
            debug!(name = file.name(), "skipping unsafe archive path");
            continue;
        };

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let target = dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&target, contents)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written.push(target);
    }

    Ok(written)
}

/// Pre-configured tool manager for the sync daemon
pub fn mutagen_tool<C: ProductConfig>(config: &C, download_url: &str) -> ToolManager {
    ToolManager::new(ToolConfig {
        name: "mutagen",
        display_name: "Mutagen",
        brew_formula: config.mutagen_brew_formula(),
        download_url: download_url.to_string(),
        docs_url: "https://mutagen.io/documentation/introduction/installation",
        user_agent: config.user_agent(),
    })
}
