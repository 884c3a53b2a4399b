// SPDX-FileCopyrightText: 2025 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;
use favsync_core::Favorites;

use crate::util::{arg_id, get_id};

#[derive(Debug, Clone)]
pub struct CmdHas {
    pub id: String,
}

impl CmdHas {
    pub const NAME: &str = "has";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Check whether an item is a favorite")
            .arg(arg_id())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
        }
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        println!("{}", favorites.is_member(&self.id));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdAdd {
    pub id: String,
}

impl CmdAdd {
    pub const NAME: &str = "add";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Add an item to your favorites")
            .arg(arg_id())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
        }
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "adding favorite...");
        let member = favorites.add(self.id.as_str()).await;
        print_membership(&self.id, member);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdRemove {
    pub id: String,
}

impl CmdRemove {
    pub const NAME: &str = "remove";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("rm")
            .about("Remove an item from your favorites")
            .arg(arg_id())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
        }
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "removing favorite...");
        let member = favorites.remove(self.id.as_str()).await;
        print_membership(&self.id, member);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdToggle {
    pub id: String,
}

impl CmdToggle {
    pub const NAME: &str = "toggle";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Add an item if it is not a favorite, remove it otherwise")
            .arg(arg_id())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
        }
    }

    pub async fn run(self, favorites: &Favorites) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "toggling favorite...");
        let member = favorites.toggle(self.id.as_str()).await;
        print_membership(&self.id, member);
        Ok(())
    }
}

fn print_membership(id: &str, member: bool) {
    println!("{}", format_membership(id, member));
}

fn format_membership(id: &str, member: bool) -> String {
    if member {
        format!("{} {id}", "★".yellow())
    } else {
        format!("{} {id}", "☆".dimmed())
    }
}
