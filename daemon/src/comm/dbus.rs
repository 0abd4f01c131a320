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

pub mod attributes_interface;
pub mod status_interface;

use crate::config;
use crate::driver::{EndpointHost, PlVersionDevice};
use crate::error::PlVersionError;
use attributes_interface::AttributesInterface;
use log::{info, trace};
use std::sync::Arc;
use zbus::Connection;

/// Object path of the attributes of the device called `device_name`.
///
/// Characters that are not allowed in an object path element are replaced by `_`, so
/// `43c10000.plversion` is served at `/com/reds/plversion/devices/43c10000_plversion`.
pub fn device_object_path(device_name: &str) -> String {
    let element: String = device_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}/{element}", config::DBUS_DEVICES_PATH)
}

/// Publishes device attributes as objects on a D-Bus connection.
pub struct DbusEndpointHost {
    connection: Connection,
}

impl DbusEndpointHost {
    pub fn new(connection: Connection) -> Self {
        DbusEndpointHost { connection }
    }
}

impl EndpointHost for DbusEndpointHost {
    async fn register(&self, device: Arc<PlVersionDevice>) -> Result<(), PlVersionError> {
        let path = device_object_path(device.name());
        trace!("Serving {} at {path}", device.name());
        let added = self
            .connection
            .object_server()
            .at(path.as_str(), AttributesInterface::new(device))
            .await
            .map_err(|e| PlVersionError::EndpointRegistration(format!("{path}: {e}")))?;
        if !added {
            return Err(PlVersionError::EndpointRegistration(format!(
                "{path} is already served"
            )));
        }
        info!("Attributes available at {path}");
        Ok(())
    }

    async fn unregister(&self, device_name: &str) -> Result<(), PlVersionError> {
        let path = device_object_path(device_name);
        let removed = self
            .connection
            .object_server()
            .remove::<AttributesInterface, _>(path.as_str())
            .await
            .map_err(|e| PlVersionError::EndpointRegistration(format!("{path}: {e}")))?;
        if !removed {
            return Err(PlVersionError::EndpointRegistration(format!(
                "{path} was not served"
            )));
        }
        trace!("Stopped serving {path}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::platform_id("43c10000.plversion", "/com/reds/plversion/devices/43c10000_plversion")]
    #[case::plain("plversion0", "/com/reds/plversion/devices/plversion0")]
    #[case::dashes("ff-version@1", "/com/reds/plversion/devices/ff_version_1")]
    fn object_paths(#[case] name: &str, #[case] expected: &str) {
        assert_that!(device_object_path(name), eq(expected));
    }
}
