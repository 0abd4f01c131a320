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

//! Device-tree discovery.
//!
//! Walks the live device tree exported by the kernel and collects the nodes whose
//! `compatible` property names one of the strings a driver registered. For each match, the
//! first `reg` entry is decoded into a physical [`MemResource`] the way the Linux platform bus
//! does for `IORESOURCE_MEM` index 0:
//!
//! ```text
//! /sys/firmware/devicetree/base/amba_pl@0
//! ├── #address-cells      00 00 00 02
//! ├── #size-cells         00 00 00 02
//! └── plversion@43c10000
//!     ├── compatible      "reds,plversion\0xlnx,version-ip-1.0\0"
//!     ├── status          "okay\0"
//!     └── reg             00 00 00 00 43 c1 00 00 00 00 00 00 00 01 00 00
//! ```
//!
//! `#address-cells`/`#size-cells` are inherited from the nearest ancestor defining them and
//! default to one cell each at the root. Bus `ranges` translation is not applied: PL buses
//! on Zynq parts map their children one to one.

use crate::error::PlVersionError;
use crate::system_io::{fs_read_bytes, fs_read_subdirs};
use log::{debug, trace, warn};
use std::path::{Path, PathBuf};

const ROOT_ADDRESS_CELLS: u32 = 1;
const ROOT_SIZE_CELLS: u32 = 1;

/// An inclusive physical address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemResource {
    pub start: u64,
    pub end: u64,
}

impl MemResource {
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn overlaps(&self, other: &MemResource) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A device-tree node matched against a driver's compatible strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNode {
    /// Directory of the node inside the exported tree.
    pub path: PathBuf,
    /// Instance name, `<unit-address>.<node-name>` when the node has a resource.
    pub name: String,
    pub compatible: Vec<String>,
    /// `None` when `reg` is missing or malformed.
    pub resource: Option<MemResource>,
}

impl DeviceNode {
    /// Whether any of the node's compatible strings is in `table`.
    pub fn matches(&self, table: &[&str]) -> bool {
        self.compatible.iter().any(|c| table.contains(&c.as_str()))
    }
}

/// Split a NUL separated string list property.
pub fn parse_string_list(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Decode a single big-endian cell property such as `#address-cells`.
pub fn parse_cell(bytes: &[u8]) -> Option<u32> {
    let cell: [u8; 4] = bytes.try_into().ok()?;
    Some(u32::from_be_bytes(cell))
}

/// Decode the first `(address, size)` pair of a `reg` property.
///
/// # Returns: `Result<MemResource, String>`
/// * `Ok(MemResource)` - The inclusive range described by the first entry
/// * `Err(String)` - Why the property cannot describe a memory range
pub fn parse_reg(
    bytes: &[u8],
    address_cells: u32,
    size_cells: u32,
) -> Result<MemResource, String> {
    if !(1..=2).contains(&address_cells) || !(1..=2).contains(&size_cells) {
        return Err(format!(
            "unsupported cell layout #address-cells={address_cells} #size-cells={size_cells}"
        ));
    }
    let entry_len = (address_cells + size_cells) as usize * 4;
    if bytes.len() < entry_len {
        return Err(format!(
            "reg is {} bytes long, expected at least {entry_len}",
            bytes.len()
        ));
    }
    let mut cells = bytes[..entry_len]
        .chunks_exact(4)
        .map(|c| u64::from(u32::from_be_bytes([c[0], c[1], c[2], c[3]])));
    let mut take = |count: u32| {
        (0..count).fold(0u64, |acc, _| (acc << 32) | cells.next().unwrap_or(0))
    };
    let start = take(address_cells);
    let size = take(size_cells);
    if size == 0 {
        return Err(format!("reg at {start:#x} has a zero size"));
    }
    let end = start
        .checked_add(size - 1)
        .ok_or_else(|| format!("reg at {start:#x} with size {size:#x} overflows"))?;
    Ok(MemResource { start, end })
}

/// Linux considers a node usable when `status` is absent, `okay` or `ok`.
fn is_available(node: &Path) -> bool {
    match fs_read_bytes(&node.join("status")) {
        Ok(bytes) => parse_string_list(&bytes)
            .first()
            .is_some_and(|s| s == "okay" || s == "ok"),
        Err(_) => true,
    }
}

fn read_cells_property(node: &Path, property: &str) -> Option<u32> {
    let bytes = fs_read_bytes(&node.join(property)).ok()?;
    let cell = parse_cell(&bytes);
    if cell.is_none() {
        warn!("{node:?}: malformed {property}, ignoring it");
    }
    cell
}

fn instance_name(node: &Path, resource: Option<&MemResource>) -> String {
    let node_name = node
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string());
    match resource {
        Some(res) => {
            let base = node_name.split('@').next().unwrap_or(&node_name);
            format!("{:x}.{base}", res.start)
        }
        None => node_name,
    }
}

fn walk(
    node: &Path,
    address_cells: u32,
    size_cells: u32,
    table: &[&str],
    found: &mut Vec<DeviceNode>,
) -> Result<(), PlVersionError> {
    let compatible = fs_read_bytes(&node.join("compatible"))
        .map(|b| parse_string_list(&b))
        .unwrap_or_default();

    if compatible.iter().any(|c| table.contains(&c.as_str())) {
        if is_available(node) {
            let resource = match fs_read_bytes(&node.join("reg")) {
                Ok(bytes) => parse_reg(&bytes, address_cells, size_cells)
                    .inspect_err(|e| warn!("{node:?}: {e}"))
                    .ok(),
                Err(_) => {
                    warn!("{node:?}: no reg property");
                    None
                }
            };
            let device = DeviceNode {
                path: node.to_owned(),
                name: instance_name(node, resource.as_ref()),
                compatible: compatible.clone(),
                resource,
            };
            debug!("Found {} at {:?}", device.name, device.path);
            found.push(device);
        } else {
            debug!("{node:?} is disabled, skipping");
        }
    }

    let child_address_cells = read_cells_property(node, "#address-cells").unwrap_or(address_cells);
    let child_size_cells = read_cells_property(node, "#size-cells").unwrap_or(size_cells);
    let children = match fs_read_subdirs(node) {
        Ok(children) => children,
        Err(e) => {
            warn!("Skipping the subtree of {node:?}: {e}");
            return Ok(());
        }
    };
    for child in children {
        walk(&child, child_address_cells, child_size_cells, table, found)?;
    }
    Ok(())
}

/// Collect every available node under `root` compatible with one of `table`.
///
/// # Returns: `Result<Vec<DeviceNode>, PlVersionError>`
/// * `Ok(Vec<DeviceNode>)` - Matching nodes in tree order; nodes without a usable `reg`
///   are included with `resource: None`
/// * `Err(PlVersionError::DeviceNotFound)` - `root` is not a directory
/// * `Err(PlVersionError::IOReadDir)` - A node directory could not be listed
pub fn find_compatible_nodes(
    root: &Path,
    table: &[&str],
) -> Result<Vec<DeviceNode>, PlVersionError> {
    if !root.is_dir() {
        return Err(PlVersionError::DeviceNotFound(format!(
            "device tree not found at {root:?}"
        )));
    }
    trace!("Scanning {root:?} for {table:?}");
    let mut found = Vec::new();
    walk(root, ROOT_ADDRESS_CELLS, ROOT_SIZE_CELLS, table, &mut found)?;
    Ok(found)
}
