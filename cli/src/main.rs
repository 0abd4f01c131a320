// This file is part of plversiond, an application exposing programmable logic version information from device-tree described hardware.
//
// Copyright 2025 REDS Institute, HEIG-VD.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// plversiond is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// plversiond is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! `plversion` - read PL version information from the plversiond daemon.
//!
//! ```bash
//! plversion list
//! plversion show
//! plversion show --device 43c10000.plversion datecode
//! ```

mod proxies;
mod status;

use crate::status::{list_handler, show_handler};
use clap::{Parser, Subcommand};
use log::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "plversion")]
#[command(bin_name = "plversion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the PL version devices bound by the daemon
    List,
    /// Print decoded version registers
    Show {
        #[arg(
            long = "device",
            help = r#"device to query, e.g. 43c10000.plversion.
All bound devices are shown when omitted."#
        )]
        device: Option<String>,
        /// One of datecode, timecode, hashcode or versioncode. All four when omitted.
        attribute: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    let result = match cli.command {
        Commands::List => list_handler().await,
        Commands::Show { device, attribute } => show_handler(&device, &attribute).await,
    };
    match result {
        Ok(msg) => {
            print!("{msg}");
            if !msg.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}
