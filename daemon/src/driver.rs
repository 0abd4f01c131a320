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

//! The PL version platform driver.
//!
//! Binds to device-tree nodes compatible with `reds,plversion` (hand written device trees) or
//! `xlnx,version-ip-1.0` (device trees generated by the Xilinx tools), maps their register
//! window and publishes four read-only attributes through an [`EndpointHost`]:
//!
//! | Attribute     | Offset | Rendering                                  |
//! |---------------|--------|--------------------------------------------|
//! | `datecode`    | `0x0`  | `Date code [YYYY MM DD] : 2020 06 15\n`    |
//! | `timecode`    | `0x4`  | `Time code [HH MM SS] : 14 30 25\n`        |
//! | `hashcode`    | `0x8`  | `deadbeef\n`                               |
//! | `versioncode` | `0xC`  | `00010203\n`                               |

use crate::decoder::{decode_date_code, decode_hash_code, decode_time_code, decode_version_code};
use crate::devicetree::{DeviceNode, MemResource};
use crate::error::PlVersionError;
use crate::io_mem::MemoryMapper;
use crate::register_block::{REGISTER_WINDOW_SIZE, RegisterBlock};
use log::{error, info, warn};
use plversiond_macros::platform_driver;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// One of the four registers of the IP core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    DateCode,
    TimeCode,
    HashCode,
    VersionCode,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::DateCode,
        Attribute::TimeCode,
        Attribute::HashCode,
        Attribute::VersionCode,
    ];

    /// Endpoint name of the attribute.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::DateCode => "datecode",
            Attribute::TimeCode => "timecode",
            Attribute::HashCode => "hashcode",
            Attribute::VersionCode => "versioncode",
        }
    }

    /// Byte offset of the register in the window.
    pub fn offset(self) -> usize {
        match self {
            Attribute::DateCode => 0x0,
            Attribute::TimeCode => 0x4,
            Attribute::HashCode => 0x8,
            Attribute::VersionCode => 0xC,
        }
    }

    /// Text returned to readers of the attribute for a raw register `word`.
    pub fn render(self, word: u32) -> String {
        match self {
            Attribute::DateCode => decode_date_code(word).to_string(),
            Attribute::TimeCode => decode_time_code(word).to_string(),
            Attribute::HashCode => decode_hash_code(word),
            Attribute::VersionCode => decode_version_code(word),
        }
    }

    // Used in the probe log.
    fn label(self) -> &'static str {
        match self {
            Attribute::DateCode => "date code",
            Attribute::TimeCode => "time code",
            Attribute::HashCode => "hash code",
            Attribute::VersionCode => "ver. code",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = PlVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                PlVersionError::Argument(format!(
                    "unknown attribute '{s}', expected one of datecode, timecode, hashcode, \
                    versioncode"
                ))
            })
    }
}

/// A bound PL version device: the instance data created by probe and threaded through every
/// later call.
#[derive(Debug)]
pub struct PlVersionDevice {
    name: String,
    node_path: PathBuf,
    compatible: Vec<String>,
    block: RegisterBlock,
}

impl PlVersionDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_path(&self) -> &Path {
        &self.node_path
    }

    pub fn compatible(&self) -> &[String] {
        &self.compatible
    }

    pub fn registers(&self) -> &RegisterBlock {
        &self.block
    }

    pub fn resource(&self) -> MemResource {
        MemResource {
            start: self.block.phys_start(),
            end: self.block.phys_end(),
        }
    }

    /// Raw register value behind `attribute`.
    pub fn raw(&self, attribute: Attribute) -> Result<u32, PlVersionError> {
        self.block.read32(attribute.offset())
    }

    /// Decoded text of `attribute`, one line terminated by `\n`.
    pub fn read_attribute(&self, attribute: Attribute) -> Result<String, PlVersionError> {
        self.raw(attribute).map(|word| attribute.render(word))
    }

    pub fn datecode(&self) -> Result<String, PlVersionError> {
        self.read_attribute(Attribute::DateCode)
    }

    pub fn timecode(&self) -> Result<String, PlVersionError> {
        self.read_attribute(Attribute::TimeCode)
    }

    pub fn hashcode(&self) -> Result<String, PlVersionError> {
        self.read_attribute(Attribute::HashCode)
    }

    pub fn versioncode(&self) -> Result<String, PlVersionError> {
        self.read_attribute(Attribute::VersionCode)
    }
}

/// Where the attributes of bound devices are published.
///
/// The daemon publishes on D-Bus (see [`crate::comm::dbus::DbusEndpointHost`]); tests use an
/// in-memory host.
#[allow(async_fn_in_trait)]
pub trait EndpointHost {
    /// Make the four attributes of `device` readable.
    ///
    /// # Returns: `Result<(), PlVersionError>`
    /// * `Ok(())` - The endpoints are live
    /// * `Err(PlVersionError::EndpointRegistration)` - Nothing was published
    async fn register(&self, device: Arc<PlVersionDevice>) -> Result<(), PlVersionError>;

    /// Withdraw the endpoints of the device called `device_name`.
    async fn unregister(&self, device_name: &str) -> Result<(), PlVersionError>;
}

#[platform_driver(
    name = "plversion",
    compatible = "reds,plversion",
    compatible = "xlnx,version-ip-1.0"
)]
#[derive(Debug)]
pub struct PlVersionDriver;

impl PlVersionDriver {
    /// Attach to `node`: map its registers and publish its attributes.
    ///
    /// A failure at any step leaves nothing behind: if publishing fails the registers are
    /// unmapped before returning.
    ///
    /// # Returns: `Result<Arc<PlVersionDevice>, PlVersionError>`
    /// * `Ok(Arc<PlVersionDevice>)` - The bound device
    /// * `Err(PlVersionError::Probe)` - Naming the device and the failed step (`discover`,
    ///   `map` or `register endpoints`)
    pub async fn probe<H: EndpointHost>(
        node: &DeviceNode,
        mapper: &dyn MemoryMapper,
        host: &H,
    ) -> Result<Arc<PlVersionDevice>, PlVersionError> {
        let name = node.name.as_str();
        info!("{name}: Device Tree Probing plversion device");

        let resource = node.resource.ok_or_else(|| {
            PlVersionError::DeviceNotFound(format!("{:?} has no usable reg property", node.path))
                .during(name, "discover")
        })?;
        if resource.size() < REGISTER_WINDOW_SIZE as u64 {
            return Err(PlVersionError::Map(format!(
                "region {:#x}..={:#x} is smaller than the {REGISTER_WINDOW_SIZE:#x} byte \
                register window",
                resource.start, resource.end
            ))
            .during(name, "map"));
        }
        let block = RegisterBlock::open(mapper, resource.start, resource.end)
            .map_err(|e| e.during(name, "map"))?;

        let device = Arc::new(PlVersionDevice {
            name: name.to_owned(),
            node_path: node.path.clone(),
            compatible: node.compatible.clone(),
            block,
        });

        if let Err(e) = host.register(device.clone()).await {
            if let Err(close_err) = device.registers().close() {
                error!("{name}: unmap after failed endpoint registration: {close_err}");
            }
            return Err(e.during(name, "register endpoints"));
        }

        for attribute in Attribute::ALL {
            match device.raw(attribute) {
                Ok(word) => info!("{name}: {} : {word:#010x}", attribute.label()),
                Err(e) => warn!("{name}: could not read {attribute}: {e}"),
            }
        }
        Ok(device)
    }

    /// Detach `device`: withdraw its endpoints, then unmap its registers.
    ///
    /// Both steps are always attempted. The first failure is returned after the registers
    /// have been unmapped.
    pub async fn remove<H: EndpointHost>(
        device: &PlVersionDevice,
        host: &H,
    ) -> Result<(), PlVersionError> {
        let name = device.name();
        info!("{name}: removing plversion device");

        let unregistered = host
            .unregister(name)
            .await
            .map_err(|e| e.during(name, "unregister endpoints"));
        if let Err(e) = &unregistered {
            error!("{e}");
        }

        let closed = device
            .registers()
            .close()
            .map_err(|e| e.during(name, "unmap"));
        if let Err(e) = &closed {
            error!("{e}");
        }

        unregistered.and(closed)
    }
}
