// SPDX-FileCopyrightText: 2025 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, path::PathBuf, sync::Arc};

use clap::{ArgMatches, Command, ValueHint, arg, builder::styling, crate_version, value_parser};
use colored::Colorize;
use favsync_core::{
    APP_NAME, Favorites, FileStorage, LocalStore, RemoteCollectionClient, SyncEvent,
};
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_subscriber::EnvFilter;

use crate::cmd_favorite::{CmdAdd, CmdHas, CmdRemove, CmdToggle};
use crate::cmd_generate_completion::CmdGenerateCompletion;
use crate::cmd_list::{CmdCount, CmdList, CmdRefresh};
use crate::config::parse_config;

/// Run the favsync command-line interface.
pub async fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse() {
        Ok(cli) => {
            if let Err(e) = cli.run().await {
                println!("{} {}", "Error:".red(), e);
            }
        }
        Err(e) => println!("{} {}", "Error:".red(), e),
    };
    Ok(())
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(APP_NAME)
            .about("Keep your favorites in sync, signed in or not.")
            .author("Zexin Yuan <aim@yzx9.xyz>")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(false) // allow default to list
            .arg_required_else_help(false)
            .arg(
                arg!(-c --config [CONFIG] "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $XDG_CONFIG_HOME/favsync/config.toml on Linux and MacOS, \
%LOCALAPPDATA%/favsync/config.toml on Windows.",
                    )
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath),
            )
            .subcommand(CmdList::command())
            .subcommand(CmdCount::command())
            .subcommand(CmdHas::command())
            .subcommand(CmdAdd::command())
            .subcommand(CmdRemove::command())
            .subcommand(CmdToggle::command())
            .subcommand(CmdRefresh::command())
            .subcommand(CmdGenerateCompletion::command())
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(matches)
    }

    /// Parse the specified arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdList::NAME, matches)) => List(CmdList::from(matches)),
            Some((CmdCount::NAME, _)) => Count(CmdCount),
            Some((CmdHas::NAME, matches)) => Has(CmdHas::from(matches)),
            Some((CmdAdd::NAME, matches)) => Add(CmdAdd::from(matches)),
            Some((CmdRemove::NAME, matches)) => Remove(CmdRemove::from(matches)),
            Some((CmdToggle::NAME, matches)) => Toggle(CmdToggle::from(matches)),
            Some((CmdRefresh::NAME, matches)) => Refresh(CmdRefresh::from(matches)),
            Some((CmdGenerateCompletion::NAME, matches)) => {
                GenerateCompletion(CmdGenerateCompletion::from(matches))
            }
            None => List(CmdList::default()),
            Some((name, _)) => return Err(format!("Unknown command: {name}").into()),
        };

        let config = matches.get_one("config").cloned();
        Ok(Cli { config, command })
    }

    /// Run the command
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config).await
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// List favorites
    List(CmdList),

    /// Count favorites
    Count(CmdCount),

    /// Check whether an item is a favorite
    Has(CmdHas),

    /// Add a favorite
    Add(CmdAdd),

    /// Remove a favorite
    Remove(CmdRemove),

    /// Toggle a favorite
    Toggle(CmdToggle),

    /// Reload favorites from the server
    Refresh(CmdRefresh),

    /// Generate shell completion
    GenerateCompletion(CmdGenerateCompletion),
}

impl Commands {
    /// Run the command with the given configuration
    #[rustfmt::skip]
    pub async fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match self {
            List(a)    => Self::run_with(config, |x| a.run(x).boxed()).await,
            Count(a)   => Self::run_with(config, |x| a.run(x).boxed()).await,
            Has(a)     => Self::run_with(config, |x| a.run(x).boxed()).await,
            Add(a)     => Self::run_with(config, |x| a.run(x).boxed()).await,
            Remove(a)  => Self::run_with(config, |x| a.run(x).boxed()).await,
            Toggle(a)  => Self::run_with(config, |x| a.run(x).boxed()).await,
            Refresh(a) => Self::run_with(config, |x| a.run(x).boxed()).await,
            GenerateCompletion(a) => a.run(),
        }
    }

    async fn run_with<F>(config: Option<PathBuf>, f: F) -> Result<(), Box<dyn Error>>
    where
        F: for<'a> FnOnce(&'a Favorites) -> BoxFuture<'a, Result<(), Box<dyn Error>>>,
    {
        tracing::debug!("parsing configuration...");
        let core = parse_config(config).await?;
        let state_dir = core
            .state_dir
            .as_ref()
            .ok_or("State directory is not configured, set `core.state_dir`")?;

        let storage = FileStorage::open(state_dir)?;
        let local = LocalStore::new(Arc::new(storage), core.storage_key.clone());
        let remote = RemoteCollectionClient::new(core.remote.clone())?;
        let favorites = Favorites::new(local, Arc::new(remote));

        let mut events = favorites.subscribe();
        let phase = favorites.activate().await;
        tracing::debug!(?phase, "favorites engine activated");

        let result = f(&favorites).await;
        report_events(&mut events);
        favorites.dispose();
        result
    }
}

fn report_events(events: &mut broadcast::Receiver<SyncEvent>) {
    loop {
        match events.try_recv() {
            Ok(SyncEvent::MutationFailed { id, desired, reason }) => {
                let action = if desired { "add" } else { "remove" };
                println!(
                    "{} failed to {action} {id}, change reverted: {reason}",
                    "Warning:".yellow()
                );
            }
            Ok(SyncEvent::ModeChanged { mode }) => tracing::info!(%mode, "mode changed"),
            Ok(SyncEvent::MembersReplaced { source }) => {
                tracing::debug!(?source, "favorites replaced");
            }
            Err(TryRecvError::Lagged(n)) => tracing::warn!(skipped = n, "missed sync events"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
