//! Reward CLI - containerised PHP development environments

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use reward_core::commands::sync::SyncCommand;
use reward_core::commands::Prompter;
use reward_core::config::loader;
use reward_core::runtime::{check_superuser, DockerCli, DockerCompose};
use reward_core::sync::Mutagen;
use reward_core::{tui, HostInfo, Loader, Orchestrator, ProductConfig, Reward, TempFiles};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reward")]
#[command(about = "CLI for managing containerised PHP development environments")]
#[command(version)]
pub struct Args {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// User configuration file (defaults to ~/.reward.yml)
    #[arg(long, global = true, env = "REWARD_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Answer "yes" to every confirmation prompt
    #[arg(short = 'y', long = "assume-yes", global = true)]
    pub assume_yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialise an environment in the current directory
    #[command(name = "env-init", alias = "init")]
    EnvInit {
        /// Environment name (lowercase letters, digits and dashes)
        name: Option<String>,
        /// Environment type (magento2, laravel, symfony, ...)
        env_type: Option<String>,
    },

    /// Control the project environment (arguments are passed to docker compose)
    #[command(disable_help_flag = true)]
    Env {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Control the shared services (arguments are passed to docker compose)
    #[command(disable_help_flag = true)]
    Svc {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Open a shell in the application container
    #[command(disable_help_flag = true)]
    Shell {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Open a shell in the debug container
    #[command(disable_help_flag = true)]
    Debug {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the blackfire CLI in the blackfire container
    #[command(disable_help_flag = true)]
    Blackfire {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Connect to, import into or dump the project database
    Db {
        /// connect, import or dump
        action: Option<String>,
        /// Use the database root credentials
        #[arg(long)]
        root: bool,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Control the file sync session
    Sync {
        /// start, stop, pause, resume, list, flush, monitor or reset
        command: String,
    },
}

/// Install the tracing subscriber; `RUST_LOG` wins over the resolved level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

async fn run(args: Args, temp: Arc<TempFiles>) -> Result<()> {
    let config = Reward;
    let host = HostInfo::detect();
    let cwd = std::env::current_dir()?;
    let home = loader::user_home()?;

    let mut flags = BTreeMap::new();
    if let Some(level) = &args.log_level {
        flags.insert("log_level".to_string(), Value::String(level.clone()));
    }

    let mut loader = Loader::new(&config, &cwd, &home);
    if let Some(path) = args.config {
        loader = loader.with_config_file(path);
    }
    let params = loader.load(&config, host.os, &flags, std::env::vars())?;

    init_logging(&params.get_string("log_level"));
    tracing::debug!(cwd = %cwd.display(), os = %host.os, "starting");

    check_superuser(&config, &params, &host)?;

    if params.get_bool(&config.key("skip_cleanup")) {
        temp.keep_on_exit(true);
    }

    let prompter: Prompter = if args.assume_yes {
        tui::confirm_yes
    } else {
        tui::confirm
    };

    let mut orchestrator = Orchestrator::new(
        config,
        params,
        host,
        cwd,
        DockerCli::new(),
        DockerCompose::new(),
        Mutagen::new(),
        temp,
    )
    .with_prompter(prompter);

    match args.command {
        Command::EnvInit { name, env_type } => {
            let configured = orchestrator
                .params
                .is_set(&orchestrator.config.key("env_type"));
            let env_type = match env_type {
                Some(t) => Some(t),
                None if name.is_some() && !configured && console::Term::stderr().is_term() => {
                    Some(tui::select_env_type()?.as_str().to_string())
                }
                None => None,
            };
            orchestrator.env_init(name.as_deref(), env_type.as_deref())?;
            Ok(())
        }
        Command::Env { args } => orchestrator.env(&args).await,
        Command::Svc { args } => orchestrator.svc(&args).await,
        Command::Shell { args } => orchestrator.shell(&args).await,
        Command::Debug { args } => orchestrator.debug(&args).await,
        Command::Blackfire { args } => orchestrator.blackfire(&args).await,
        Command::Db { action, root, args } => orchestrator.db(action.as_deref(), root, &args).await,
        Command::Sync { command } => orchestrator.sync(command.parse::<SyncCommand>()?).await,
    }
}

#[tokio::main]
async fn main() {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    let temp = Arc::new(TempFiles::new());

    // Handle Ctrl+C: drop generated compose files and restore the cursor
    let on_interrupt = Arc::clone(&temp);
    ctrlc::set_handler(move || {
        on_interrupt.purge();
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    let result = run(args, Arc::clone(&temp)).await;

    temp.purge();
    let _ = console::Term::stderr().show_cursor();

    if let Err(err) = result {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(reward_core::exit_code(&err));
    }
}
