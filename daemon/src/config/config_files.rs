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

//! TOML configuration files.
//!
//! ```toml
//! [system_paths]
//! device_tree_dir = "/proc/device-tree"
//! dev_mem_path = "/dev/mem"
//! ```
//!
//! Every key is optional. Keys missing from both files fall back to the hardcoded defaults in
//! [`crate::config`].

use crate::config::{self, Config};
use crate::error::PlVersionError;
use crate::system_io::fs_read;
use log::trace;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// This is the top level struct which holds all sections
#[derive(Debug, Deserialize)]
pub(crate) struct TomlConfig {
    system_paths: Option<SystemPaths>,
}

/// This is the "system_paths" section struct
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct SystemPaths {
    pub device_tree_dir: Option<String>,
    pub dev_mem_path: Option<String>,
}

impl SystemPaths {
    /// Fill keys missing from `self` with the ones from `fallback`.
    pub fn merge(self, fallback: SystemPaths) -> SystemPaths {
        SystemPaths {
            device_tree_dir: self.device_tree_dir.or(fallback.device_tree_dir),
            dev_mem_path: self.dev_mem_path.or(fallback.dev_mem_path),
        }
    }
}

impl From<SystemPaths> for Config {
    fn from(value: SystemPaths) -> Self {
        trace!("Creating Config from {value:?}");
        Config {
            device_tree_dir: PathBuf::from(value.device_tree_dir.unwrap_or_else(|| {
                trace!("No device_tree_dir provided. Using hardcoded value.");
                config::DEVICE_TREE_DIR.to_string()
            })),
            dev_mem_path: PathBuf::from(value.dev_mem_path.unwrap_or_else(|| {
                trace!("No dev_mem_path provided. Using hardcoded value.");
                config::DEV_MEM_PATH.to_string()
            })),
        }
    }
}

fn toml_str_to_config(file_path: &Path, toml_string: &str) -> Result<TomlConfig, PlVersionError> {
    toml::from_str(toml_string).map_err(|e| PlVersionError::TomlDe {
        file: file_path.into(),
        e,
    })
}

/// Parse the `[system_paths]` section of a config file.
///
/// # Returns: `Result<Option<SystemPaths>, PlVersionError>`
/// * `Ok(Some(SystemPaths))` - The section was found
/// * `Ok(None)` - The file does not exist or has no such section
/// * `Err(PlVersionError::IORead)` - The file exists but could not be read
/// * `Err(PlVersionError::TomlDe)` - The file is not valid TOML for this schema
pub fn system_paths_from_file(file_path: &Path) -> Result<Option<SystemPaths>, PlVersionError> {
    if !file_path.is_file() {
        trace!("Config file not found in {file_path:?}");
        return Ok(None);
    }
    let config = toml_str_to_config(file_path, &fs_read(file_path)?)?;
    Ok(config.system_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::full(
        "[system_paths]\ndevice_tree_dir = \"/proc/device-tree\"\ndev_mem_path = \"/dev/fake\"\n",
        Some("/proc/device-tree"),
        Some("/dev/fake")
    )]
    #[case::partial("[system_paths]\ndev_mem_path = \"/dev/fake\"\n", None, Some("/dev/fake"))]
    #[case::empty_section("[system_paths]\n", None, None)]
    fn parses_system_paths(
        #[case] toml_string: &str,
        #[case] device_tree_dir: Option<&str>,
        #[case] dev_mem_path: Option<&str>,
    ) {
        let config = toml_str_to_config(Path::new("test.toml"), toml_string).unwrap();
        assert_that!(
            config.system_paths,
            eq(&Some(SystemPaths {
                device_tree_dir: device_tree_dir.map(String::from),
                dev_mem_path: dev_mem_path.map(String::from),
            }))
        );
    }

    #[gtest]
    fn missing_section_is_none() {
        let config = toml_str_to_config(Path::new("test.toml"), "[other]\nkey = 1\n").unwrap();
        assert_that!(config.system_paths, eq(&None));
    }

    #[gtest]
    fn malformed_toml_names_the_file() {
        let result = toml_str_to_config(Path::new("broken.toml"), "[system_paths\n");
        assert_that!(
            result,
            err(displays_as(contains_substring("broken.toml")))
        );
    }

    #[gtest]
    fn user_values_override_vendor_values() {
        let user = SystemPaths {
            device_tree_dir: Some("/user/dt".into()),
            dev_mem_path: None,
        };
        let vendor = SystemPaths {
            device_tree_dir: Some("/vendor/dt".into()),
            dev_mem_path: Some("/vendor/mem".into()),
        };
        let config: Config = user.merge(vendor).into();
        assert_that!(config.device_tree_dir, eq(&PathBuf::from("/user/dt")));
        assert_that!(config.dev_mem_path, eq(&PathBuf::from("/vendor/mem")));
    }

    #[gtest]
    fn empty_merge_uses_hardcoded_defaults() {
        let config: Config = SystemPaths::default().merge(SystemPaths::default()).into();
        assert_that!(config, eq(&Config::default()));
    }

    #[gtest]
    fn missing_file_is_not_an_error() {
        let result = system_paths_from_file(Path::new("/no/such/plversiond.toml"));
        assert_that!(result, ok(eq(&None)));
    }
}
