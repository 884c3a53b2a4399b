// SPDX-FileCopyrightText: 2025 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io};

use clap::{ArgMatches, Command};
use colored::Colorize;
use favsync_core::{Favorites, MemberId, Mode};

use crate::util::ArgOutputFormat;

#[derive(Debug, Clone, Copy)]
pub struct CmdList {
    pub output_format: ArgOutputFormat,
}

impl Default for CmdList {
    fn default() -> Self {
        Self {
            output_format: ArgOutputFormat::Table,
        }
    }
}

impl CmdList {
    pub const NAME: &str = "list";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("ls")
            .about("List your favorites")
            .arg(ArgOutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            output_format: ArgOutputFormat::from(matches),
        }
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "listing favorites...");
        let members = favorites.members();
        write_members(
            &mut io::stdout(),
            &members,
            favorites.mode(),
            self.output_format,
        )
    }
}

fn write_members(
    w: &mut impl io::Write,
    members: &[MemberId],
    mode: Option<Mode>,
    output_format: ArgOutputFormat,
) -> Result<(), Box<dyn Error>> {
    match output_format {
        ArgOutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(members)?)?;
        }
        ArgOutputFormat::Table => {
            if members.is_empty() {
                writeln!(w, "{}", "No favorites yet".italic())?;
            }
            let width = members.len().to_string().len();
            for (i, id) in members.iter().enumerate() {
                writeln!(w, "{:>width$}  {}", (i + 1).to_string().dimmed(), id)?;
            }
            if let Some(mode) = mode {
                writeln!(w, "{}", format!("({mode})").dimmed())?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct CmdCount;

impl CmdCount {
    pub const NAME: &str = "count";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Show the number of favorites")
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        println!("{}", favorites.count());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CmdRefresh {
    pub output_format: ArgOutputFormat,
}

impl CmdRefresh {
    pub const NAME: &str = "refresh";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Reload favorites from the server")
            .arg(ArgOutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            output_format: ArgOutputFormat::from(matches),
        }
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "refreshing favorites...");
        if !favorites.refresh().await {
            println!(
                "{} favorites were not refreshed ({})",
                "Note:".yellow(),
                favorites
                    .mode()
                    .map_or_else(|| "not ready".to_string(), |m| m.to_string())
            );
        }

        let members = favorites.members();
        write_members(
            &mut io::stdout(),
            &members,
            favorites.mode(),
            self.output_format,
        )
    }
}
