// Copyright (C) 2025 Launchpad Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::path::PathBuf;

use clap::builder::ValueHint;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(name = "launchpad-daemon")]
#[command(about = "Launch-pipeline scheduling daemon")]
pub struct Args {
    #[arg(
        short,
        long,
        value_name = "config",
        help = "Path to a YAML or JSON configuration file. Values there are overridden by \
                any command-line flag given alongside it.",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "data-dir",
        help = "Directory the fjall task store writes into. Required when --task-store-backend=fjall.",
        value_hint = ValueHint::DirPath
    )]
    pub data_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "backend",
        help = "Task store backend: \"memory\" or \"fjall\""
    )]
    pub task_store_backend: Option<String>,

    #[arg(
        long,
        value_name = "offer-listen",
        help = "Address the offer-ingestion listener binds to",
        default_value = "127.0.0.1:7890"
    )]
    pub offer_listen: String,

    #[arg(long, help = "Emit logs as JSON instead of the compact text format")]
    pub log_json: bool,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,
}
