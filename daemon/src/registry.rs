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

//! Driver match tables and the set of bound devices.
//!
//! Drivers add their compatible strings at startup through the `register_driver` hook
//! generated by `#[platform_driver]`. Matched device-tree nodes are then probed, and every
//! bound [`PlVersionDevice`] is tracked here until it is removed or the daemon shuts down.

use crate::devicetree::{DeviceNode, MemResource, find_compatible_nodes};
use crate::driver::{EndpointHost, PlVersionDevice, PlVersionDriver};
use crate::error::PlVersionError;
use crate::io_mem::MemoryMapper;
use log::{error, info, trace, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct DeviceTable {
    bound: BTreeMap<String, Arc<PlVersionDevice>>,
    /// Names claimed by a probe that has not finished yet.
    pending: BTreeSet<String>,
}

/// Claim on a device name for the duration of a probe. Released on drop.
struct Reservation<'a> {
    table: &'a Mutex<DeviceTable>,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut table = match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => poisoned.into_inner(),
        };
        table.pending.remove(&self.name);
    }
}

#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: Vec<(&'static str, &'static [&'static str])>,
    devices: Mutex<DeviceTable>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the match table of the driver called `name`.
    pub fn register_driver(
        &mut self,
        name: &'static str,
        of_match_table: &'static [&'static str],
    ) {
        trace!("Registering driver {name} for {of_match_table:?}");
        self.drivers.push((name, of_match_table));
    }

    /// Name of the first registered driver claiming one of `compatible`.
    pub fn match_compatible(&self, compatible: &[String]) -> Option<&'static str> {
        self.drivers
            .iter()
            .find(|(_, table)| compatible.iter().any(|c| table.contains(&c.as_str())))
            .map(|(name, _)| *name)
    }

    /// Every compatible string claimed by a registered driver.
    pub fn compatible_strings(&self) -> Vec<&'static str> {
        self.drivers
            .iter()
            .flat_map(|(_, table)| table.iter().copied())
            .collect()
    }

    /// Find the nodes under `device_tree_dir` that a registered driver claims.
    pub fn discover(&self, device_tree_dir: &Path) -> Result<Vec<DeviceNode>, PlVersionError> {
        find_compatible_nodes(device_tree_dir, &self.compatible_strings())
    }

    fn table(&self) -> Result<MutexGuard<'_, DeviceTable>, PlVersionError> {
        self.devices
            .lock()
            .map_err(|_| PlVersionError::Internal("couldn't lock the device table".into()))
    }

    /// Claim `name` unless it is bound or being probed.
    fn reserve(
        &self,
        name: &str,
        resource: Option<MemResource>,
    ) -> Result<Reservation<'_>, PlVersionError> {
        let mut table = self.table()?;
        if table.bound.contains_key(name) || table.pending.contains(name) {
            return Err(PlVersionError::Argument(format!(
                "a device named {name} is already bound"
            )));
        }
        if let Some(resource) = resource {
            for other in table.bound.values() {
                let theirs = other.resource();
                if resource.overlaps(&theirs) {
                    warn!(
                        "{name}: region {:#x}-{:#x} overlaps {} at {:#x}-{:#x}",
                        resource.start,
                        resource.end,
                        other.name(),
                        theirs.start,
                        theirs.end
                    );
                }
            }
        }
        table.pending.insert(name.to_owned());
        Ok(Reservation {
            table: &self.devices,
            name: name.to_owned(),
        })
    }

    /// Bind a single node.
    ///
    /// The device name is claimed before the driver runs, so a second probe of the same name
    /// fails without mapping or publishing anything.
    ///
    /// # Returns: `Result<Arc<PlVersionDevice>, PlVersionError>`
    /// * `Ok(Arc<PlVersionDevice>)` - The device, now tracked by the registry
    /// * `Err(PlVersionError::Argument)` - No driver claims the node, or a device with the same
    ///   name is already bound or being probed
    /// * `Err(PlVersionError::Probe)` - The driver failed to attach
    pub async fn probe<H: EndpointHost>(
        &self,
        node: &DeviceNode,
        mapper: &dyn MemoryMapper,
        host: &H,
    ) -> Result<Arc<PlVersionDevice>, PlVersionError> {
        let Some(driver) = self.match_compatible(&node.compatible) else {
            return Err(PlVersionError::Argument(format!(
                "no registered driver is compatible with {:?}",
                node.compatible
            )));
        };
        if driver != PlVersionDriver::NAME {
            return Err(PlVersionError::Internal(format!(
                "driver {driver} has no probe routine"
            )));
        }
        let _reservation = self.reserve(&node.name, node.resource)?;

        let device = PlVersionDriver::probe(node, mapper, host).await?;
        self.table()?
            .bound
            .insert(device.name().to_owned(), device.clone());
        Ok(device)
    }

    /// Bind every node in `nodes`, logging the ones that fail.
    ///
    /// A failing node never prevents the others from binding.
    ///
    /// # Returns: `usize`
    /// * The number of devices bound by this call
    pub async fn probe_all<H: EndpointHost>(
        &self,
        nodes: &[DeviceNode],
        mapper: &dyn MemoryMapper,
        host: &H,
    ) -> usize {
        let mut count = 0;
        for node in nodes {
            match self.probe(node, mapper, host).await {
                Ok(_) => count += 1,
                Err(e) => error!("Failed to bind {}: {e}", node.name),
            }
        }
        info!("Bound {count} of {} plversion devices", nodes.len());
        count
    }

    /// Unbind the device called `name`.
    ///
    /// The device is forgotten even if withdrawing its endpoints fails.
    pub async fn remove<H: EndpointHost>(
        &self,
        name: &str,
        host: &H,
    ) -> Result<(), PlVersionError> {
        let device = self
            .table()?
            .bound
            .remove(name)
            .ok_or_else(|| PlVersionError::DeviceNotFound(format!("no device named {name}")))?;
        PlVersionDriver::remove(&device, host).await
    }

    /// Unbind every device.
    ///
    /// # Returns: `Result<(), PlVersionError>`
    /// * `Ok(())` - Every device was detached cleanly
    /// * `Err(PlVersionError)` - The first failure; the remaining devices are still detached
    pub async fn shutdown<H: EndpointHost>(&self, host: &H) -> Result<(), PlVersionError> {
        let devices = std::mem::take(&mut self.table()?.bound);
        let mut result = Ok(());
        for device in devices.into_values() {
            if let Err(e) = PlVersionDriver::remove(&device, host).await {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Snapshot of the bound devices, ordered by name.
    pub fn devices(&self) -> Vec<Arc<PlVersionDevice>> {
        match self.table() {
            Ok(table) => table.bound.values().cloned().collect(),
            Err(e) => {
                error!("{e}");
                Vec::new()
            }
        }
    }

    pub fn device(&self, name: &str) -> Result<Arc<PlVersionDevice>, PlVersionError> {
        self.table()?
            .bound
            .get(name)
            .cloned()
            .ok_or_else(|| PlVersionError::DeviceNotFound(format!("no device named {name}")))
    }
}
