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

//! Owned register window of one device instance.
//!
//! A [`RegisterBlock`] is created by [`RegisterBlock::open`] when a device is probed and closed
//! when it is removed. Reads take a shared lock, so any number of callers may read
//! concurrently; [`RegisterBlock::close`] takes the exclusive lock, which means a read either
//! completes against the live mapping or observes the block as closed and fails with
//! [`PlVersionError::NotOpen`] without touching memory.
//!
//! No exclusive reservation of the physical range is taken. Two blocks over overlapping
//! ranges can coexist.

use crate::error::PlVersionError;
use crate::io_mem::{IoWindow, MemoryMapper};
use log::{debug, trace};
use std::fmt;
use std::sync::RwLock;

/// Size of the PL version register window: four 32-bit registers.
pub const REGISTER_WINDOW_SIZE: usize = 0x10;

pub struct RegisterBlock {
    phys_start: u64,
    phys_end: u64,
    window: RwLock<Option<Box<dyn IoWindow>>>,
}

impl RegisterBlock {
    /// Map the inclusive physical range `[phys_start, phys_end]`.
    ///
    /// # Returns: `Result<RegisterBlock, PlVersionError>`
    /// * `Ok(RegisterBlock)` - The range is mapped and readable
    /// * `Err(PlVersionError::Map)` - `phys_end < phys_start`, `phys_start` is not 32-bit
    ///   aligned, the range length does not fit in memory, or the mapper failed
    pub fn open(
        mapper: &dyn MemoryMapper,
        phys_start: u64,
        phys_end: u64,
    ) -> Result<RegisterBlock, PlVersionError> {
        if phys_end < phys_start {
            return Err(PlVersionError::Map(format!(
                "invalid range {phys_start:#x}..={phys_end:#x}: end is below start"
            )));
        }
        if phys_start % size_of::<u32>() as u64 != 0 {
            return Err(PlVersionError::Map(format!(
                "range start {phys_start:#x} is not 32-bit aligned"
            )));
        }
        let len = (phys_end - phys_start)
            .checked_add(1)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| {
                PlVersionError::Map(format!(
                    "range {phys_start:#x}..={phys_end:#x} is too large to map"
                ))
            })?;

        let window = mapper.map(phys_start, len)?;
        debug!("Mapped {len:#x} bytes at {phys_start:#x}");
        Ok(RegisterBlock {
            phys_start,
            phys_end,
            window: RwLock::new(Some(window)),
        })
    }

    pub fn phys_start(&self) -> u64 {
        self.phys_start
    }

    /// Last mapped physical byte, inclusive.
    pub fn phys_end(&self) -> u64 {
        self.phys_end
    }

    pub fn is_open(&self) -> bool {
        self.window.read().is_ok_and(|w| w.is_some())
    }

    /// Read the 32-bit register at `offset` bytes from the start of the block.
    ///
    /// # Returns: `Result<u32, PlVersionError>`
    /// * `Ok(u32)` - Register value
    /// * `Err(PlVersionError::NotOpen)` - The block was closed
    /// * `Err(PlVersionError::OutOfRange)` - `offset` is misaligned or outside the window
    pub fn read32(&self, offset: usize) -> Result<u32, PlVersionError> {
        let guard = self.window.read().map_err(|e| {
            PlVersionError::Internal(format!("register window lock poisoned: {e}"))
        })?;
        let window = guard.as_ref().ok_or_else(|| {
            PlVersionError::NotOpen(format!("block at {:#x} was closed", self.phys_start))
        })?;
        let value = window.read32(offset)?;
        trace!("{:#x}+{offset:#x} = {value:#010x}", self.phys_start);
        Ok(value)
    }

    /// Unmap the block. Later reads fail with [`PlVersionError::NotOpen`].
    ///
    /// # Returns: `Result<(), PlVersionError>`
    /// * `Ok(())` - The mapping was released
    /// * `Err(PlVersionError::NotOpen)` - The block was already closed
    pub fn close(&self) -> Result<(), PlVersionError> {
        // A poisoned lock still holds a valid window, unmap it anyway.
        let mut guard = self
            .window
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.take() {
            Some(window) => {
                drop(window);
                debug!("Unmapped block at {:#x}", self.phys_start);
                Ok(())
            }
            None => Err(PlVersionError::NotOpen(format!(
                "block at {:#x} is already closed",
                self.phys_start
            ))),
        }
    }

    /// Whether the physical ranges of `self` and `other` share at least one byte.
    pub fn overlaps(&self, other: &RegisterBlock) -> bool {
        self.phys_start <= other.phys_end && other.phys_start <= self.phys_end
    }
}

impl fmt::Debug for RegisterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterBlock")
            .field("phys_start", &format_args!("{:#x}", self.phys_start))
            .field("phys_end", &format_args!("{:#x}", self.phys_end))
            .field("open", &self.is_open())
            .finish()
    }
}
