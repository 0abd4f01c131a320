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

//! Paths and names used by the daemon, plus the runtime [`Config`].
//!
//! The hardcoded values below are the defaults; they can be overridden through the TOML files
//! described in [`config_files`]. The user file at [`USER_CONFIG_PATH`] takes precedence over
//! the vendor file at [`VENDOR_CONFIG_PATH`].

pub mod config_files;

use crate::config::config_files::{SystemPaths, system_paths_from_file};
use log::{trace, warn};
use std::path::{Path, PathBuf};

/// Where the kernel exposes the live device tree. `/proc/device-tree` links here.
pub static DEVICE_TREE_DIR: &str = "/sys/firmware/devicetree/base";

/// Character device giving access to physical memory.
pub static DEV_MEM_PATH: &str = "/dev/mem";

/// Configuration shipped with the package.
pub static VENDOR_CONFIG_PATH: &str = "/usr/lib/plversiond/config.toml";

/// Configuration written by the administrator. Overrides [`VENDOR_CONFIG_PATH`].
pub static USER_CONFIG_PATH: &str = "/etc/plversiond/config.toml";

/// Well-known name claimed on the system bus.
pub static DBUS_SERVICE_NAME: &str = "com.reds.plversion";

/// Object path of the status interface.
pub static DBUS_ROOT_PATH: &str = "/com/reds/plversion";

/// Parent object path of the per-device attribute objects.
pub static DBUS_DEVICES_PATH: &str = "/com/reds/plversion/devices";

/// Resolved runtime configuration, passed by reference to whoever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub device_tree_dir: PathBuf,
    pub dev_mem_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_tree_dir: PathBuf::from(DEVICE_TREE_DIR),
            dev_mem_path: PathBuf::from(DEV_MEM_PATH),
        }
    }
}

/// Read the `[system_paths]` section of `path`, treating any failure as "nothing configured".
fn system_paths_or_empty(path: &Path) -> SystemPaths {
    match system_paths_from_file(path) {
        Ok(Some(paths)) => paths,
        Ok(None) => {
            trace!("{path:?} has no usable [system_paths] section");
            SystemPaths::default()
        }
        Err(e) => {
            warn!("Ignoring {path:?}: {e}");
            SystemPaths::default()
        }
    }
}

/// Build the [`Config`] from the given user and vendor files.
pub fn load_config_from(user_path: &Path, vendor_path: &Path) -> Config {
    let user = system_paths_or_empty(user_path);
    let vendor = system_paths_or_empty(vendor_path);
    let config: Config = user.merge(vendor).into();
    trace!("Resolved config: {config:?}");
    config
}

/// Build the [`Config`] from the standard user and vendor locations.
pub fn load_config() -> Config {
    load_config_from(Path::new(USER_CONFIG_PATH), Path::new(VENDOR_CONFIG_PATH))
}
