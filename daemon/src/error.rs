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

use log::error;
use std::path::PathBuf;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum PlVersionError {
    #[error("PlVersionError::DeviceNotFound: {0}")]
    DeviceNotFound(String),
    #[error("PlVersionError::Map: Failed to map register window: {0}")]
    Map(String),
    #[error("PlVersionError::EndpointRegistration: {0}")]
    EndpointRegistration(String),
    #[error("PlVersionError::NotOpen: Register block is not mapped: {0}")]
    NotOpen(String),
    #[error(
        "PlVersionError::OutOfRange: offset {offset:#x} is not a 32-bit aligned offset inside a \
        {len:#x} byte window"
    )]
    OutOfRange { offset: usize, len: usize },
    #[error("PlVersionError::Probe: {device}: {step} failed: {source}")]
    Probe {
        device: String,
        step: &'static str,
        source: Box<PlVersionError>,
    },
    #[error("PlVersionError::Argument: {0}")]
    Argument(String),
    #[error("PlVersionError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("PlVersionError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error("PlVersionError::TomlDe: Failed to parse config {file:?}: {e}")]
    TomlDe { file: PathBuf, e: toml::de::Error },
    #[error("PlVersionError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl PlVersionError {
    /// Wrap `self` as the failure of `step` while attaching or detaching `device`.
    pub fn during(self, device: &str, step: &'static str) -> PlVersionError {
        PlVersionError::Probe {
            device: device.to_owned(),
            step,
            source: Box::new(self),
        }
    }
}

impl From<PlVersionError> for fdo::Error {
    fn from(err: PlVersionError) -> Self {
        error!("{err}");
        match err {
            PlVersionError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            PlVersionError::DeviceNotFound(..) => fdo::Error::UnknownObject(err.to_string()),
            PlVersionError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            PlVersionError::IOReadDir { .. } => fdo::Error::IOError(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
