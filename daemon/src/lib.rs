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

//! plversiond - programmable logic version information for device-tree described hardware.
//!
//! A `reds,plversion` (or `xlnx,version-ip-1.0`) IP core exposes four 32-bit read-only
//! registers describing the bitstream loaded in the PL: build date, build time, source hash
//! and version. This crate finds those cores in the device tree, maps their registers through
//! `/dev/mem` and publishes the decoded values.
//!
//! - [`decoder`] - Pure conversion of register words to display text
//! - [`register_block`] - Open/read/close guard over a mapped register window
//! - [`io_mem`] - Mapping backends
//! - [`devicetree`] - Discovery of compatible nodes
//! - [`driver`] and [`registry`] - Probe/remove lifecycle of bound devices
//! - [`comm`] - The D-Bus endpoints

pub mod comm;
pub mod config;
pub mod decoder;
pub mod devicetree;
pub mod driver;
pub mod error;
pub mod io_mem;
pub mod register_block;
pub mod registry;
pub mod system_io;
