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

use crate::proxies::status_proxy;
use zbus::Connection;

/// Attributes in register order.
pub const ATTRIBUTES: [&str; 4] = ["datecode", "timecode", "hashcode", "versioncode"];

/// A bound device as reported by `ListDevices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    pub region: String,
}

/// Parse the `<name>:<start>-<end>` lines of `ListDevices`, ignoring malformed ones.
pub fn parse_device_list(list_str: &str) -> Vec<DeviceEntry> {
    list_str
        .lines()
        .filter_map(|line| {
            let (name, region) = line.split_once(':')?;
            if name.is_empty() {
                return None;
            }
            Some(DeviceEntry {
                name: name.to_string(),
                region: region.to_string(),
            })
        })
        .collect()
}

pub async fn call_list_devices() -> Result<Vec<DeviceEntry>, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = status_proxy::StatusProxy::new(&connection).await?;
    Ok(parse_device_list(&proxy.list_devices().await?))
}

pub async fn call_read_attribute(
    device_name: &str,
    attribute: &str,
) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = status_proxy::StatusProxy::new(&connection).await?;
    proxy.read_attribute(device_name, attribute).await
}

pub async fn list_handler() -> Result<String, zbus::Error> {
    let devices = call_list_devices().await?;
    if devices.is_empty() {
        return Ok("No plversion device bound".to_string());
    }
    let mut ret_string = String::from(
        "---- DEVICES ----\n\
        | dev | region |\n",
    );
    for device in devices {
        ret_string += format!("| {} | {} |\n", device.name, device.region).as_str();
    }
    Ok(ret_string)
}

async fn device_message(
    device_name: &str,
    attribute: &Option<String>,
) -> Result<String, zbus::Error> {
    let mut ret_string = format!("---- {device_name} ----\n");
    match attribute {
        Some(attribute) => ret_string += &call_read_attribute(device_name, attribute).await?,
        None => {
            for attribute in ATTRIBUTES {
                let value = call_read_attribute(device_name, attribute).await?;
                ret_string += format!("{attribute:<12}{value}").as_str();
            }
        }
    }
    Ok(ret_string)
}

/// Print `attribute` (all four when `None`) for `device_name`, or for every device.
pub async fn show_handler(
    device_name: &Option<String>,
    attribute: &Option<String>,
) -> Result<String, zbus::Error> {
    let device_names = match device_name {
        Some(dev) => vec![dev.clone()],
        None => call_list_devices()
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect(),
    };
    if device_names.is_empty() {
        return Err(zbus::Error::Failure("No plversion device bound".to_string()));
    }
    let mut messages = Vec::with_capacity(device_names.len());
    for dev in &device_names {
        messages.push(device_message(dev, attribute).await?);
    }
    Ok(messages.join("\n"))
}
