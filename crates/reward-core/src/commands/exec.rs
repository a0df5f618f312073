//! Exec shortcuts into project containers

use super::Orchestrator;
use crate::error::EnvError;
use crate::plan::SqlRewriter;
use crate::product::ProductConfig;
use crate::runtime::{ComposeRunner, ContainerRuntime, IoMode};
use crate::sync::SyncTool;
use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbAction {
    Connect,
    Import,
    Dump,
}

impl FromStr for DbAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "connect" => Ok(DbAction::Connect),
            "import" => Ok(DbAction::Import),
            "dump" => Ok(DbAction::Dump),
            other => bail!("unknown db command '{}' (expected connect, import or dump)", other),
        }
    }
}

impl fmt::Display for DbAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DbAction::Connect => "connect",
            DbAction::Import => "import",
            DbAction::Dump => "dump",
        };
        f.write_str(s)
    }
}

/// Quote an argument for `sh -c`
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn sh_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|a| shell_quote(a)))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<C, R, D, S> Orchestrator<C, R, D, S>
where
    C: ProductConfig,
    R: ContainerRuntime,
    D: ComposeRunner,
    S: SyncTool,
{
    /// Value of `<app>_<key>`, or `fallback` when unset or empty
    fn setting(&self, key: &str, fallback: &str) -> String {
        let value = self.params.get_string(&self.config.key(key));
        if value.is_empty() {
            fallback.to_string()
        } else {
            value
        }
    }

    async fn exec(&mut self, exec_args: Vec<String>, mode: IoMode) -> Result<()> {
        let project = self.project()?;
        let plan = self.build_plan(&project)?;
        self.run_compose(&plan, &exec_args, mode).await?;
        Ok(())
    }

    /// Interactive shell in the application container
    pub async fn shell(&mut self, args: &[String]) -> Result<()> {
        let project = self.project()?;
        let (container, user, command) = if project.env_type.is_pwa_studio() {
            ("node", "node", "sh")
        } else {
            ("php-fpm", "www-data", "bash")
        };
        let mut exec_args = vec![
            "exec".to_string(),
            "-u".to_string(),
            self.setting("shell_user", user),
            self.setting("shell_container", container),
            self.setting("shell_command", command),
        ];
        exec_args.extend_from_slice(args);
        self.exec(exec_args, IoMode::Interactive).await
    }

    /// Shell in the debug-enabled PHP container
    pub async fn debug(&mut self, args: &[String]) -> Result<()> {
        let mut exec_args = vec![
            "exec".to_string(),
            "-u".to_string(),
            self.setting("shell_user", "www-data"),
            self.setting("debug_container", "php-debug"),
            self.setting("debug_command", "bash"),
        ];
        exec_args.extend_from_slice(args);
        self.exec(exec_args, IoMode::Interactive).await
    }

    /// Blackfire CLI in the profiler container
    pub async fn blackfire(&mut self, args: &[String]) -> Result<()> {
        let command = sh_command(&self.setting("blackfire_command", "blackfire"), args);
        let exec_args = vec![
            "exec".to_string(),
            self.setting("blackfire_container", "php-blackfire"),
            "sh".to_string(),
            "-c".to_string(),
            command,
        ];
        self.exec(exec_args, IoMode::Interactive).await
    }

    /// Database client, import or dump in the database container
    ///
    /// Credentials come from the container's own environment; `root`
    /// switches to the root account.
    pub async fn db(&mut self, action: Option<&str>, root: bool, args: &[String]) -> Result<()> {
        let action: DbAction = action
            .ok_or(EnvError::ArgumentRequired("db command (connect, import or dump)"))?
            .parse()?;

        let credentials = if root {
            "-uroot -p\"$MYSQL_ROOT_PASSWORD\""
        } else {
            "-u\"$MYSQL_USER\" -p\"$MYSQL_PASSWORD\""
        };
        let (program, database, tty, mode) = match action {
            DbAction::Connect => (
                self.setting("env_db_command", "mysql"),
                "--database=\"$MYSQL_DATABASE\"",
                true,
                IoMode::Interactive,
            ),
            DbAction::Import => {
                let buffer = self
                    .params
                    .get_u64(&self.config.key("db_import_line_buffer_size"))
                    .unwrap_or(10);
                (
                    self.setting("env_db_command", "mysql"),
                    "--database=\"$MYSQL_DATABASE\"",
                    false,
                    IoMode::SqlImport(SqlRewriter::new(buffer)),
                )
            }
            DbAction::Dump => (
                self.setting("env_db_dump_command", "mysqldump"),
                "\"$MYSQL_DATABASE\"",
                false,
                IoMode::Interactive,
            ),
        };

        let mut command = format!("{} {} {}", program, credentials, database);
        for arg in args {
            command.push(' ');
            command.push_str(&shell_quote(arg));
        }

        let mut exec_args = vec!["exec".to_string()];
        if !tty {
            exec_args.push("-T".to_string());
        }
        exec_args.extend([
            self.setting("env_db_container", "db"),
            "sh".to_string(),
            "-c".to_string(),
            command,
        ]);
        self.exec(exec_args, mode).await
    }
}
