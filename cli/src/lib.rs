// SPDX-FileCopyrightText: 2025 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line host for the favsync engine.

mod cli;
mod cmd_favorite;
mod cmd_generate_completion;
mod cmd_list;
mod config;
mod util;

pub use crate::cli::{Cli, Commands, run};
