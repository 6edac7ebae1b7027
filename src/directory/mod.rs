//! Ordered set of item headers for one container.
//!
//! Entries are only ever appended.  Each append is checked against every
//! existing entry for byte-range overlap, so the non-overlap invariant holds
//! incrementally and reads never need to re-validate the whole set.
//!
//! # Serialized form
//! `count: u32 LE` followed by `count` item header records.  Records may mix
//! wire versions; each is sized by its own tag byte.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Read, Write};

use crate::error::ContainerError;
use crate::header::ItemHeader;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerDirectory {
    entries: Vec<ItemHeader>,
}

impl ContainerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `header`, returning its zero-based index.
    pub fn append(&mut self, header: ItemHeader) -> Result<usize, ContainerError> {
        self.check_overlap(&header)?;
        self.entries.push(header);
        Ok(self.entries.len() - 1)
    }

    /// Fail if `header` would overlap an existing entry.  Nothing is stored.
    pub fn check_overlap(&self, header: &ItemHeader) -> Result<(), ContainerError> {
        match self.entries.iter().enumerate().find(|(_, e)| e.overlaps(header)) {
            Some((existing, other)) => Err(ContainerError::Overlap {
                offset:          header.offset,
                end:             header.end(),
                existing,
                existing_offset: other.offset,
                existing_end:    other.end(),
            }),
            None => Ok(()),
        }
    }

    pub fn get(&self, index: usize) -> Result<ItemHeader, ContainerError> {
        self.entries
            .get(index)
            .copied()
            .ok_or(ContainerError::IndexOutOfBounds { index, count: self.entries.len() })
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ItemHeader> {
        self.entries.iter()
    }

    /// Entries carrying `type_code`, with their indices.
    pub fn find_by_type(&self, type_code: u16) -> impl Iterator<Item = (usize, &ItemHeader)> {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, h)| h.type_code() == type_code)
    }

    /// Largest `offset + length` over all entries (0 when empty).
    pub fn end_offset(&self) -> u64 {
        self.entries.iter().map(ItemHeader::end).max().unwrap_or(0)
    }

    /// Fail if any entry reaches past `stream_len`.
    pub fn check_extent(&self, stream_len: u64) -> Result<(), ContainerError> {
        let beyond = self.entries.iter().find(|h| {
            h.offset.checked_add(h.length).map_or(true, |end| end > stream_len)
        });
        match beyond {
            Some(h) => Err(ContainerError::ExtentBeyondStream {
                offset: h.offset,
                length: h.length,
                stream_len,
            }),
            None => Ok(()),
        }
    }

    /// Fail if any entry starts before `data_start` or overlaps the
    /// `region_len` bytes at `region_offset`.  Empty entries only fail the
    /// first test.
    pub fn check_reserved(
        &self,
        data_start:    u64,
        region_offset: u64,
        region_len:    u64,
    ) -> Result<(), ContainerError> {
        let region = ItemHeader::new(region_offset, region_len, Default::default());
        for (index, h) in self.entries.iter().enumerate() {
            let name = if h.offset < data_start {
                "superblock"
            } else if h.overlaps(&region) {
                "directory"
            } else {
                continue;
            };
            return Err(ContainerError::ReservedRegion {
                index,
                offset: h.offset,
                length: h.length,
                region: name,
            });
        }
        Ok(())
    }

    /// Serialize the directory, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<u64, ContainerError> {
        let count = u32::try_from(self.entries.len()).map_err(|_| ContainerError::FieldOverflow {
            field: "directory count",
            value: self.entries.len() as u64,
        })?;
        writer.write_u32::<LittleEndian>(count)?;

        let mut written = 4u64;
        for header in &self.entries {
            written += header.write(&mut writer)? as u64;
        }
        Ok(written)
    }

    /// Load a serialized directory.  Entries are re-appended, so a directory
    /// with overlapping ranges is rejected on load.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, ContainerError> {
        let count = reader.read_u32::<LittleEndian>().map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ContainerError::TruncatedHeader,
            _ => e.into(),
        })? as usize;

        let mut directory = Self { entries: Vec::with_capacity(count.min(4096)) };
        for _ in 0..count {
            directory.append(ItemHeader::read(&mut reader)?)?;
        }
        Ok(directory)
    }
}

impl<'a> IntoIterator for &'a ContainerDirectory {
    type Item = &'a ItemHeader;
    type IntoIter = std::slice::Iter<'a, ItemHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
