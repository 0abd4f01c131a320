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

use crate::driver::PlVersionDevice;
use log::info;
use std::sync::Arc;
use zbus::{fdo, interface};

/// The four decoded registers of one device, plus a description of the instance.
pub struct AttributesInterface {
    device: Arc<PlVersionDevice>,
}

impl AttributesInterface {
    pub fn new(device: Arc<PlVersionDevice>) -> Self {
        AttributesInterface { device }
    }
}

#[interface(name = "com.reds.plversion.Attributes")]
impl AttributesInterface {
    async fn datecode(&self) -> Result<String, fdo::Error> {
        info!("datecode called on {}", self.device.name());
        Ok(self.device.datecode()?)
    }

    async fn timecode(&self) -> Result<String, fdo::Error> {
        info!("timecode called on {}", self.device.name());
        Ok(self.device.timecode()?)
    }

    async fn hashcode(&self) -> Result<String, fdo::Error> {
        info!("hashcode called on {}", self.device.name());
        Ok(self.device.hashcode()?)
    }

    async fn versioncode(&self) -> Result<String, fdo::Error> {
        info!("versioncode called on {}", self.device.name());
        Ok(self.device.versioncode()?)
    }

    async fn name(&self) -> String {
        self.device.name().to_owned()
    }

    /// Physical range of the register window as `<start>-<end>`.
    async fn region(&self) -> String {
        let resource = self.device.resource();
        format!("{:#010x}-{:#010x}", resource.start, resource.end)
    }
}
