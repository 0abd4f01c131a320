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

//! Error Wrapping File System I/O Helpers
//!
//! Thin wrappers around `std::fs` that trace what they touch and convert failures to
//! [`PlVersionError`] with the offending path attached. Device-tree properties are binary
//! blobs, so there is a byte-oriented reader next to the string one.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use plversiond::system_io::{fs_read, fs_read_bytes};
//! # use std::path::Path;
//! # fn example() -> Result<(), plversiond::error::PlVersionError> {
//! let model = fs_read(Path::new("/sys/firmware/devicetree/base/model"))?;
//! let node = Path::new("/sys/firmware/devicetree/base/amba_pl/plversion@43c10000");
//! let reg = fs_read_bytes(&node.join("reg"))?;
//! # Ok(())
//! # }
//! ```

use crate::error::PlVersionError;
use log::trace;
use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, PlVersionError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(PlVersionError::IORead)` - If the file cannot be read or is not UTF-8
pub fn fs_read(file_path: &Path) -> Result<String, PlVersionError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf: String = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(PlVersionError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Read the raw contents of a file.
///
/// # Returns: `Result<Vec<u8>, PlVersionError>`
/// * `Ok(Vec<u8>)` - The complete contents of the file
/// * `Err(PlVersionError::IORead)` - If the file cannot be read
pub fn fs_read_bytes(file_path: &Path) -> Result<Vec<u8>, PlVersionError> {
    trace!("Attempting to read bytes from {file_path:?}");
    std::fs::read(file_path).map_err(|e| PlVersionError::IORead {
        file: file_path.into(),
        e,
    })
}

/// List the sub-directories of `dir`.
///
/// Entries that cannot be stat'ed are skipped. The result is sorted so that walks over the
/// device tree are deterministic.
///
/// # Returns: `Result<Vec<PathBuf>, PlVersionError>`
/// * `Ok(Vec<PathBuf>)` - Full paths of the sub-directories
/// * `Err(PlVersionError::IOReadDir)` - If the directory cannot be read
pub fn fs_read_subdirs(dir: &Path) -> Result<Vec<PathBuf>, PlVersionError> {
    trace!("Attempting to read directory '{dir:?}'");
    let iter = std::fs::read_dir(dir).map_err(|e| PlVersionError::IOReadDir {
        dir: dir.to_owned(),
        e,
    })?;
    let mut ret: Vec<PathBuf> = iter
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();
    ret.sort();
    trace!("Dir reading done.");
    Ok(ret)
}
