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

//! Memory-mapping backends.
//!
//! A [`MemoryMapper`] turns a physical address range into an [`IoWindow`]: a mapping that can
//! be read 32 bits at a time and that unmaps itself when dropped. [`DevMemMapper`] is the real
//! backend, mapping `/dev/mem` uncached. Tests plug in their own mapper to count map/unmap
//! calls without touching hardware.

use crate::error::PlVersionError;
use log::{error, trace};
use rustix::fs::{Mode, OFlags};
use rustix::mm::{MapFlags, ProtFlags};
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// A mapped physical range. Dropping the window unmaps it.
pub trait IoWindow: Send + Sync + fmt::Debug {
    /// Size of the window in bytes.
    fn len(&self) -> usize;

    /// Volatile 32-bit read at `offset` bytes from the start of the window.
    ///
    /// # Returns: `Result<u32, PlVersionError>`
    /// * `Ok(u32)` - The register value
    /// * `Err(PlVersionError::OutOfRange)` - `offset` is misaligned or the read would leave the
    ///   window. No access is performed.
    fn read32(&self, offset: usize) -> Result<u32, PlVersionError>;
}

/// Something able to map physical memory.
pub trait MemoryMapper: Send + Sync {
    /// Map `len` bytes of physical memory starting at `phys_start`.
    ///
    /// # Returns: `Result<Box<dyn IoWindow>, PlVersionError>`
    /// * `Ok(Box<dyn IoWindow>)` - The mapping
    /// * `Err(PlVersionError::Map)` - The range could not be mapped
    fn map(&self, phys_start: u64, len: usize) -> Result<Box<dyn IoWindow>, PlVersionError>;
}

/// Check that a 32-bit access at `offset` stays aligned and inside a `len` byte window.
pub fn check_offset(offset: usize, len: usize) -> Result<(), PlVersionError> {
    let in_window = offset
        .checked_add(size_of::<u32>())
        .is_some_and(|end| end <= len);
    if offset % size_of::<u32>() != 0 || !in_window {
        return Err(PlVersionError::OutOfRange { offset, len });
    }
    Ok(())
}

/// Maps physical memory through `/dev/mem`.
///
/// The device is opened with `O_SYNC` so the kernel hands out an uncached mapping, which is
/// what register reads need. Mappings are read-only and `MAP_SHARED`.
#[derive(Debug, Clone)]
pub struct DevMemMapper {
    dev_mem_path: PathBuf,
}

impl DevMemMapper {
    pub fn new(dev_mem_path: &Path) -> Self {
        DevMemMapper {
            dev_mem_path: dev_mem_path.to_owned(),
        }
    }
}

impl MemoryMapper for DevMemMapper {
    fn map(&self, phys_start: u64, len: usize) -> Result<Box<dyn IoWindow>, PlVersionError> {
        if len == 0 {
            return Err(PlVersionError::Map(format!(
                "refusing to map an empty range at {phys_start:#x}"
            )));
        }
        if phys_start % size_of::<u32>() as u64 != 0 {
            return Err(PlVersionError::Map(format!(
                "{phys_start:#x} is not 32-bit aligned"
            )));
        }
        let page_size = rustix::param::page_size();
        let page_offset = (phys_start % page_size as u64) as usize;
        let map_phys = phys_start - page_offset as u64;
        let map_len = len.checked_add(page_offset).ok_or_else(|| {
            PlVersionError::Map(format!("range {phys_start:#x}+{len:#x} overflows"))
        })?;

        trace!(
            "Mapping {map_len:#x} bytes at {map_phys:#x} from {:?}",
            self.dev_mem_path
        );
        let fd = rustix::fs::open(
            self.dev_mem_path.as_path(),
            OFlags::RDONLY | OFlags::SYNC | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| PlVersionError::Map(format!("cannot open {:?}: {e}", self.dev_mem_path)))?;

        // SAFETY: a fresh read-only shared mapping of a file descriptor we own. The kernel picks
        // the address, so no existing memory is replaced. The returned pointer stays valid
        // until the munmap in `DevMemWindow::drop`; closing `fd` afterwards does not affect it.
        let map_base = unsafe {
            rustix::mm::mmap(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ,
                MapFlags::SHARED,
                &fd,
                map_phys,
            )
        }
        .map_err(|e| {
            PlVersionError::Map(format!(
                "mmap of {map_len:#x} bytes at {map_phys:#x} failed: {e}"
            ))
        })?;
        let map_base = NonNull::new(map_base)
            .ok_or_else(|| PlVersionError::Map("mmap returned a null pointer".into()))?;
        // SAFETY: page_offset < map_len, so the result stays inside the mapping.
        let data = unsafe { map_base.cast::<u8>().add(page_offset) };

        trace!("Mapped {phys_start:#x} at {data:p}");
        Ok(Box::new(DevMemWindow {
            map_base,
            map_len,
            data,
            len,
            phys_start,
        }))
    }
}

/// A live `/dev/mem` mapping.
///
/// # Invariants
///
/// `map_base` was returned by `mmap` for `map_len` bytes and has not been unmapped.
/// `data..data + len` lies inside that mapping.
#[derive(Debug)]
pub struct DevMemWindow {
    map_base: NonNull<c_void>,
    map_len: usize,
    data: NonNull<u8>,
    len: usize,
    phys_start: u64,
}

// SAFETY: the window is only ever read through volatile loads; there is no interior state that
// concurrent readers could corrupt.
unsafe impl Send for DevMemWindow {}
unsafe impl Sync for DevMemWindow {}

impl IoWindow for DevMemWindow {
    fn len(&self) -> usize {
        self.len
    }

    fn read32(&self, offset: usize) -> Result<u32, PlVersionError> {
        check_offset(offset, self.len)?;
        // SAFETY: check_offset keeps the 4-byte access aligned and inside `data..data + len`,
        // which the type invariants place inside a live mapping.
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.data.add(offset).cast::<u32>().read_volatile() };
        trace!(
            "read32 @ {:#x} = {value:#010x}",
            self.phys_start + offset as u64
        );
        Ok(value)
    }
}

impl Drop for DevMemWindow {
    fn drop(&mut self) {
        trace!("Unmapping {:#x}", self.phys_start);
        // SAFETY: per the type invariants this is the live mapping returned by mmap. Nothing can
        // read through it any more since we are being dropped.
        if let Err(e) = unsafe { rustix::mm::munmap(self.map_base.as_ptr(), self.map_len) } {
            error!("munmap of window at {:#x} failed: {e}", self.phys_start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::first(0x0)]
    #[case::last(0xC)]
    fn offsets_inside_the_window_pass(#[case] offset: usize) {
        assert_that!(check_offset(offset, 0x10), ok(anything()));
    }

    #[gtest]
    #[rstest]
    #[case::misaligned(0x2)]
    #[case::past_the_end(0x10)]
    #[case::straddles_the_end(0xE)]
    #[case::overflow(usize::MAX - 1)]
    fn offsets_outside_the_window_fail(#[case] offset: usize) {
        assert_that!(
            check_offset(offset, 0x10),
            err(displays_as(contains_substring("PlVersionError::OutOfRange")))
        );
    }

    #[gtest]
    fn dev_mem_mapper_reports_missing_device() {
        let mapper = DevMemMapper::new(Path::new("/no/such/mem"));
        let result = mapper.map(0x4000_0000, 0x10);
        assert_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring("cannot open")))
        );
    }

    /// A regular file standing in for `/dev/mem`, holding `0x2000` bytes where each 32-bit word
    /// contains its own byte offset.
    struct MemFile(PathBuf);

    impl MemFile {
        fn new(tag: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "plversiond-mem-{}-{tag}",
                std::process::id()
            ));
            let contents: Vec<u8> = (0..0x2000u32)
                .step_by(4)
                .flat_map(|offset| offset.to_ne_bytes())
                .collect();
            std::fs::write(&path, contents).unwrap();
            MemFile(path)
        }
    }

    impl Drop for MemFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[gtest]
    #[rstest]
    #[case::page_start(0x1000, 0x0)]
    #[case::inside_page(0x1010, 0xC)]
    #[case::first_page(0x0ff0, 0x8)]
    fn dev_mem_mapper_reads_through_a_real_mapping(
        #[case] phys_start: u64,
        #[case] offset: usize,
    ) {
        let mem = MemFile::new(&format!("read-{phys_start:x}"));
        let mapper = DevMemMapper::new(&mem.0);
        let window = mapper.map(phys_start, 0x10).unwrap();
        expect_that!(window.len(), eq(0x10));
        expect_that!(
            window.read32(offset),
            ok(eq(&(phys_start as u32 + offset as u32)))
        );
        expect_that!(
            window.read32(0x10),
            err(displays_as(contains_substring("PlVersionError::OutOfRange")))
        );
        drop(window);
    }

    #[gtest]
    #[rstest]
    #[case::odd(0x1001)]
    #[case::half_word(0x1002)]
    fn dev_mem_mapper_refuses_misaligned_start(#[case] phys_start: u64) {
        let mem = MemFile::new(&format!("misaligned-{phys_start:x}"));
        let mapper = DevMemMapper::new(&mem.0);
        assert_that!(
            mapper.map(phys_start, 0x10).map(|_| ()),
            err(displays_as(contains_substring("not 32-bit aligned")))
        );
    }

    #[gtest]
    fn dev_mem_mapper_refuses_empty_range() {
        let mapper = DevMemMapper::new(Path::new("/dev/mem"));
        assert_that!(
            mapper.map(0x4000_0000, 0).map(|_| ()),
            err(displays_as(contains_substring("empty range")))
        );
    }
}
