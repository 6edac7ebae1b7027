//! High-level [`Container`] API, the primary embedding surface.
//!
//! ```no_run
//! use multistream::container::{Container, PackOptions};
//! use multistream::flags::ItemFlags;
//!
//! // Write
//! let mut c = Container::create("out.mst", PackOptions::default())?;
//! let idx = c.add(3, ItemFlags::GZIPPED | ItemFlags::ASSURED, b"Hello, world!")?;
//! c.finalize()?;
//!
//! // Read
//! let mut c = Container::open("out.mst")?;
//! assert_eq!(c.read(idx)?, b"Hello, world!");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::codec::DEFAULT_COMPRESSION_LEVEL;
use crate::error::ContainerError;
use crate::flags::ItemFlags;
use crate::header::ItemHeader;
use crate::integrity::IntegrityAlgorithm;
use crate::io_stream::{ContainerReader, ContainerWriter};
use crate::superblock::Superblock;

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`Container::create`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// gzip level 0–9, used for `GZIPPED` items.
    pub compression_level: u32,
    /// Digest algorithm for `ASSURED` items; recorded in the superblock.
    pub integrity:         IntegrityAlgorithm,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            integrity:         IntegrityAlgorithm::default(),
        }
    }
}

// ── ItemInfo ──────────────────────────────────────────────────────────────────

/// Lightweight descriptor returned by [`Container::list`].
#[derive(Debug, Clone, Serialize)]
pub struct ItemInfo {
    pub index:     usize,
    pub offset:    u64,
    pub length:    u64,
    pub version:   u8,
    pub type_code: u16,
    pub gzipped:   bool,
    pub assured:   bool,
}

impl ItemInfo {
    fn new(index: usize, h: &ItemHeader) -> Self {
        ItemInfo {
            index,
            offset:    h.offset,
            length:    h.length,
            version:   h.version().tag(),
            type_code: h.type_code(),
            gzipped:   h.has_flag(ItemFlags::GZIPPED),
            assured:   h.has_flag(ItemFlags::ASSURED),
        }
    }
}

// ── ContainerMode ─────────────────────────────────────────────────────────────

enum ContainerMode {
    Read(ContainerReader<File>),
    Write(ContainerWriter<File>),
}

// ── Container ─────────────────────────────────────────────────────────────────

pub struct Container {
    path: PathBuf,
    mode: ContainerMode,
}

impl Container {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_owned();
        let reader = ContainerReader::open(File::open(&path)?)?;
        Ok(Self { path, mode: ContainerMode::Read(reader) })
    }

    pub fn create<P: AsRef<Path>>(path: P, opts: PackOptions) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_owned();
        let writer = ContainerWriter::with_options(
            File::create(&path)?,
            opts.compression_level,
            opts.integrity,
        )?;
        Ok(Self { path, mode: ContainerMode::Write(writer) })
    }

    // ── Write ─────────────────────────────────────────────────────────────────

    pub fn add(&mut self, type_code: u16, flags: ItemFlags, data: &[u8]) -> Result<usize, ContainerError> {
        match &mut self.mode {
            ContainerMode::Write(w) => w.append(type_code, flags, data),
            ContainerMode::Read(_)  => Err(read_only()),
        }
    }

    /// Write the directory and patch the superblock.  Must be called once.
    pub fn finalize(&mut self) -> Result<(), ContainerError> {
        match &mut self.mode {
            ContainerMode::Write(w) => w.finalize(),
            ContainerMode::Read(_)  => Err(read_only()),
        }
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    pub fn list(&self) -> Vec<ItemInfo> {
        let directory = match &self.mode {
            ContainerMode::Read(r)  => r.directory(),
            ContainerMode::Write(w) => w.directory(),
        };
        directory.iter().enumerate().map(|(i, h)| ItemInfo::new(i, h)).collect()
    }

    pub fn stat(&self, index: usize) -> Option<ItemInfo> {
        self.list().into_iter().nth(index)
    }

    pub fn read(&mut self, index: usize) -> Result<Vec<u8>, ContainerError> {
        match &mut self.mode {
            ContainerMode::Read(r)  => r.read_item(index),
            ContainerMode::Write(_) => Err(write_only()),
        }
    }

    /// Check every assured item; returns the indices that failed.
    pub fn verify(&mut self) -> Result<Vec<(usize, ContainerError)>, ContainerError> {
        match &mut self.mode {
            ContainerMode::Read(r) => Ok(r
                .verify_all()
                .into_iter()
                .filter_map(|(i, res)| res.err().map(|e| (i, e)))
                .collect()),
            ContainerMode::Write(_) => Err(write_only()),
        }
    }

    /// Extract every item into `dest` as `item_{index:04}_t{type}.bin`.
    pub fn extract_all<P: AsRef<Path>>(&mut self, dest: P) -> Result<Vec<PathBuf>, ContainerError> {
        let dest = dest.as_ref();
        if !dest.exists() { std::fs::create_dir_all(dest)?; }
        let mut written = Vec::new();
        for info in self.list() {
            let data = self.read(info.index)?;
            let path = dest.join(format!("item_{:04}_t{}.bin", info.index, info.type_code));
            File::create(&path)?.write_all(&data)?;
            written.push(path);
        }
        Ok(written)
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn path(&self) -> &Path { &self.path }

    pub fn superblock(&self) -> &Superblock {
        match &self.mode {
            ContainerMode::Read(r)  => &r.superblock,
            ContainerMode::Write(w) => &w.superblock,
        }
    }

    pub fn uuid(&self) -> uuid::Uuid {
        self.superblock().container_uuid
    }

    pub fn integrity(&self) -> IntegrityAlgorithm {
        self.superblock().integrity
    }
}

fn read_only()  -> ContainerError { io::Error::new(io::ErrorKind::PermissionDenied, "container is read-only").into() }
fn write_only() -> ContainerError { io::Error::new(io::ErrorKind::PermissionDenied, "container is write-only").into() }
