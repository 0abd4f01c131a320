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

//! PL version daemon (plversiond).
//!
//! Binds every PL version IP core found in the device tree and serves its decoded registers
//! on the system bus until SIGINT or SIGTERM.
//!
//! # DBus Service
//!
//! - **Service Name**: `com.reds.plversion`
//! - **Status Interface**: `/com/reds/plversion` - Device list and attribute lookup by name
//! - **Attributes Interface**: `/com/reds/plversion/devices/<device>` - One object per device
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`

use log::{error, info};
use plversiond::comm::dbus::DbusEndpointHost;
use plversiond::comm::dbus::status_interface::StatusInterface;
use plversiond::config::{self, load_config};
use plversiond::driver::PlVersionDriver;
use plversiond::io_mem::DevMemMapper;
use plversiond::registry::DriverRegistry;
use std::error::Error;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use zbus::connection;

/// Resolve once SIGINT or SIGTERM is received.
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

/// Main entry point for the plversiond daemon.
///
/// 1. Sets up logging via `env_logger` (defaults to "info" level)
/// 2. Loads the vendor and user configuration
/// 3. Registers the driver and claims `com.reds.plversion` on the system bus
/// 4. Probes every compatible device-tree node
/// 5. Waits for a termination signal, then detaches every device
///
/// # Returns: `Result<(), Box<dyn Error>>`
/// * `Ok(())` - Clean shutdown
/// * `Err(Box<dyn Error>)` - Initialization error (DBus connection failed, etc.)
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = load_config();

    let mut registry = DriverRegistry::new();
    PlVersionDriver::register_driver(&mut registry);
    let registry = Arc::new(registry);

    let conn = connection::Builder::system()?
        .name(config::DBUS_SERVICE_NAME)?
        .serve_at(config::DBUS_ROOT_PATH, StatusInterface::new(registry.clone()))?
        .build()
        .await?;
    info!("Started {} dbus service", config::DBUS_SERVICE_NAME);

    let host = DbusEndpointHost::new(conn.clone());
    let mapper = DevMemMapper::new(&config.dev_mem_path);
    match registry.discover(&config.device_tree_dir) {
        Ok(nodes) => {
            registry.probe_all(&nodes, &mapper, &host).await;
        }
        Err(e) => error!("Device discovery failed: {e}"),
    }

    shutdown_signal().await?;
    info!("Shutting down");
    if let Err(e) = registry.shutdown(&host).await {
        error!("{e}");
    }
    Ok(())
}
