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

#![allow(dead_code)]

use plversiond::driver::{Attribute, EndpointHost, PlVersionDevice};
use plversiond::error::PlVersionError;
use plversiond::io_mem::{IoWindow, MemoryMapper, check_offset};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DATE_WORD: u32 = 0x2020_0615;
pub const TIME_WORD: u32 = 0x1430_2500;
pub const HASH_WORD: u32 = 0xDEAD_BEEF;
pub const VERSION_WORD: u32 = 0x0001_0203;

pub const SAMPLE_REGISTERS: [u32; 4] = [DATE_WORD, TIME_WORD, HASH_WORD, VERSION_WORD];

#[derive(Debug, Default)]
pub struct Counters {
    pub maps: AtomicUsize,
    pub unmaps: AtomicUsize,
    pub reads: AtomicUsize,
}

impl Counters {
    pub fn maps(&self) -> usize {
        self.maps.load(Ordering::SeqCst)
    }

    pub fn unmaps(&self) -> usize {
        self.unmaps.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Fake physical memory: register contents keyed by physical start address.
#[derive(Debug, Default)]
pub struct MockMapper {
    banks: HashMap<u64, Vec<u32>>,
    pub counters: Arc<Counters>,
}

impl MockMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bank(mut self, phys_start: u64, words: &[u32]) -> Self {
        self.banks.insert(phys_start, words.to_vec());
        self
    }
}

impl MemoryMapper for MockMapper {
    fn map(&self, phys_start: u64, len: usize) -> Result<Box<dyn IoWindow>, PlVersionError> {
        let words = self.banks.get(&phys_start).cloned().ok_or_else(|| {
            PlVersionError::Map(format!("nothing to map at {phys_start:#x}"))
        })?;
        self.counters.maps.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockWindow {
            words,
            len,
            counters: self.counters.clone(),
        }))
    }
}

#[derive(Debug)]
struct MockWindow {
    words: Vec<u32>,
    len: usize,
    counters: Arc<Counters>,
}

impl IoWindow for MockWindow {
    fn len(&self) -> usize {
        self.len
    }

    fn read32(&self, offset: usize) -> Result<u32, PlVersionError> {
        check_offset(offset, self.len)?;
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.words.get(offset / 4).copied().unwrap_or(0))
    }
}

impl Drop for MockWindow {
    fn drop(&mut self) {
        self.counters.unmaps.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory endpoint host standing in for the bus.
#[derive(Debug, Default)]
pub struct RecordingHost {
    endpoints: Mutex<BTreeMap<String, Arc<PlVersionDevice>>>,
    refuse: HashSet<String>,
    refuse_unregister: HashSet<String>,
    pub unregistered: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that fails to publish the device called `name`.
    pub fn refusing(name: &str) -> Self {
        RecordingHost {
            refuse: HashSet::from([name.to_owned()]),
            ..Self::default()
        }
    }

    /// A host that fails to withdraw the device called `name`.
    pub fn refusing_unregister(name: &str) -> Self {
        RecordingHost {
            refuse_unregister: HashSet::from([name.to_owned()]),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().keys().cloned().collect()
    }

    /// What a reader of the endpoint would get.
    pub fn query(&self, name: &str, attribute: Attribute) -> Result<String, PlVersionError> {
        let device = self
            .endpoints
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PlVersionError::DeviceNotFound(name.to_owned()))?;
        device.read_attribute(attribute)
    }
}

impl EndpointHost for RecordingHost {
    async fn register(&self, device: Arc<PlVersionDevice>) -> Result<(), PlVersionError> {
        if self.refuse.contains(device.name()) {
            return Err(PlVersionError::EndpointRegistration(format!(
                "refusing {}",
                device.name()
            )));
        }
        self.endpoints
            .lock()
            .unwrap()
            .insert(device.name().to_owned(), device);
        Ok(())
    }

    async fn unregister(&self, device_name: &str) -> Result<(), PlVersionError> {
        self.unregistered
            .lock()
            .unwrap()
            .push(device_name.to_owned());
        if self.refuse_unregister.contains(device_name) {
            return Err(PlVersionError::EndpointRegistration(format!(
                "refusing to withdraw {device_name}"
            )));
        }
        self.endpoints
            .lock()
            .unwrap()
            .remove(device_name)
            .map(|_| ())
            .ok_or_else(|| {
                PlVersionError::EndpointRegistration(format!("{device_name} was not published"))
            })
    }
}

/// Publishes through a [`RecordingHost`] after giving other tasks a chance to run.
#[derive(Debug, Default)]
pub struct YieldingHost {
    pub inner: RecordingHost,
}

impl EndpointHost for YieldingHost {
    async fn register(&self, device: Arc<PlVersionDevice>) -> Result<(), PlVersionError> {
        tokio::task::yield_now().await;
        self.inner.register(device).await
    }

    async fn unregister(&self, device_name: &str) -> Result<(), PlVersionError> {
        self.inner.unregister(device_name).await
    }
}

/// A regular file standing in for `/dev/mem`, with `words` stored at byte `offset`.
pub struct MemFile {
    path: PathBuf,
}

impl MemFile {
    pub fn new(tag: &str, offset: usize, words: &[u32]) -> Self {
        let path = std::env::temp_dir().join(format!(
            "plversiond-it-mem-{}-{tag}",
            std::process::id()
        ));
        let mut contents = vec![0u8; offset + 0x1000];
        for (i, word) in words.iter().enumerate() {
            let at = offset + i * 4;
            contents[at..at + 4].copy_from_slice(&word.to_ne_bytes());
        }
        fs::write(&path, contents).unwrap();
        MemFile { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// A device tree laid out on disk the way `/sys/firmware/devicetree/base` exports it.
pub struct DeviceTreeFixture {
    root: PathBuf,
}

impl DeviceTreeFixture {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "plversiond-it-{}-{tag}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        DeviceTreeFixture { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn property(&self, node: &str, name: &str, value: &[u8]) -> &Self {
        let dir = self.root.join(node);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), value).unwrap();
        self
    }

    /// Add a node with a single `<start size>` reg entry using one cell each.
    pub fn plversion_node(&self, node: &str, compatible: &str, start: u32, size: u32) -> &Self {
        self.property(node, "compatible", &string_list(&[compatible]))
            .property(node, "reg", &cells(&[start, size]))
    }
}

impl Drop for DeviceTreeFixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

pub fn cells(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn string_list(values: &[&str]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| v.bytes().chain(std::iter::once(0)))
        .collect()
}
