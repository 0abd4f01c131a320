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

use crate::driver::Attribute;
use crate::error::PlVersionError;
use crate::registry::DriverRegistry;
use log::info;
use std::sync::Arc;
use zbus::{fdo, interface};

/// Daemon-wide view of the bound devices.
pub struct StatusInterface {
    registry: Arc<DriverRegistry>,
}

impl StatusInterface {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        StatusInterface { registry }
    }
}

/// One `<name>:<start>-<end>` line per bound device.
pub fn device_list(registry: &DriverRegistry) -> String {
    registry
        .devices()
        .iter()
        .map(|device| {
            let resource = device.resource();
            format!(
                "{}:{:#010x}-{:#010x}\n",
                device.name(),
                resource.start,
                resource.end
            )
        })
        .collect()
}

/// Decoded `attribute` of the device called `device_name`.
pub fn read_device_attribute(
    registry: &DriverRegistry,
    device_name: &str,
    attribute: &str,
) -> Result<String, PlVersionError> {
    let attribute: Attribute = attribute.parse()?;
    registry.device(device_name)?.read_attribute(attribute)
}

#[interface(name = "com.reds.plversion.status")]
impl StatusInterface {
    async fn list_devices(&self) -> Result<String, fdo::Error> {
        info!("list_devices called");
        Ok(device_list(&self.registry))
    }

    async fn read_attribute(
        &self,
        device_name: &str,
        attribute: &str,
    ) -> Result<String, fdo::Error> {
        info!("read_attribute called with device_name: {device_name} and attribute: {attribute}");
        Ok(read_device_attribute(&self.registry, device_name, attribute)?)
    }
}
