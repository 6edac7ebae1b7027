//! Item header wire codec.
//!
//! An item header addresses one sub-stream inside the container.  Two record
//! shapes exist, selected by payload length and identified by a leading tag
//! byte:
//!
//! ```text
//! v1 (15 B):  tag=1 | offset i64 | length u32 | type_and_flags u16
//! v2 (19 B):  tag=2 | offset i64 | length i64 | type_and_flags u16
//! ```
//!
//! All multi-byte integers are little-endian.  The version is not part of the
//! logical header; it is derived from `length` on every encode, so the common
//! case stays at 15 bytes while lengths of 4 GiB and above remain
//! representable.  A reader must consume the tag before it knows how many
//! bytes belong to the record.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Read, Write};

use crate::error::ContainerError;
use crate::flags::{ItemFlags, TypeAndFlags};

/// Encoded size of a version-1 record.
pub const V1_RECORD_LEN: usize = 1 + 8 + 4 + 2;
/// Encoded size of a version-2 record.
pub const V2_RECORD_LEN: usize = 1 + 8 + 8 + 2;
/// Lengths strictly below this value use version 1.
pub const V1_LENGTH_LIMIT: u64 = u32::MAX as u64;

/// On-wire record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireVersion {
    V1 = 1,
    V2 = 2,
}

impl WireVersion {
    pub fn for_length(length: u64) -> Self {
        if length < V1_LENGTH_LIMIT { WireVersion::V1 } else { WireVersion::V2 }
    }

    pub fn from_tag(tag: u8) -> Result<Self, ContainerError> {
        match tag {
            1 => Ok(WireVersion::V1),
            2 => Ok(WireVersion::V2),
            other => Err(ContainerError::UnknownVersion(other)),
        }
    }

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Total record size including the tag byte.
    #[inline]
    pub fn record_len(self) -> usize {
        match self {
            WireVersion::V1 => V1_RECORD_LEN,
            WireVersion::V2 => V2_RECORD_LEN,
        }
    }
}

/// Location, size and kind of one sub-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ItemHeader {
    pub offset:         u64,
    pub length:         u64,
    pub type_and_flags: TypeAndFlags,
}

impl ItemHeader {
    pub fn new(offset: u64, length: u64, type_and_flags: TypeAndFlags) -> Self {
        Self { offset, length, type_and_flags }
    }

    /// Exclusive end of the payload range.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    pub fn type_code(&self) -> u16 {
        self.type_and_flags.type_code()
    }

    pub fn flags(&self) -> ItemFlags {
        self.type_and_flags.flags()
    }

    pub fn has_flag(&self, flag: ItemFlags) -> bool {
        self.type_and_flags.has_flag(flag)
    }

    pub fn is_gzipped(&self) -> bool {
        self.has_flag(ItemFlags::GZIPPED)
    }

    pub fn is_assured(&self) -> bool {
        self.has_flag(ItemFlags::ASSURED)
    }

    /// Wire version this header encodes as.
    pub fn version(&self) -> WireVersion {
        WireVersion::for_length(self.length)
    }

    pub fn encoded_len(&self) -> usize {
        self.version().record_len()
    }

    /// Half-open interval intersection.  Empty ranges never overlap.
    pub fn overlaps(&self, other: &ItemHeader) -> bool {
        self.length > 0
            && other.length > 0
            && self.offset < other.end()
            && other.offset < self.end()
    }

    /// Serialize one record, returning the number of bytes written.
    ///
    /// Fails before writing anything if `offset` (or a version-2 `length`)
    /// exceeds the signed 64-bit wire field.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<usize, ContainerError> {
        let buf = self.encode()?;
        writer.write_all(&buf)?;
        Ok(buf.len())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ContainerError> {
        let offset = signed_field("offset", self.offset)?;
        let version = self.version();
        let mut buf = Vec::with_capacity(version.record_len());

        buf.write_u8(version.tag())?;
        buf.write_i64::<LittleEndian>(offset)?;
        match version {
            // for_length guarantees the value fits
            WireVersion::V1 => buf.write_u32::<LittleEndian>(self.length as u32)?,
            WireVersion::V2 => {
                buf.write_i64::<LittleEndian>(signed_field("length", self.length)?)?
            }
        }
        buf.write_u16::<LittleEndian>(self.type_and_flags.raw())?;

        debug_assert_eq!(buf.len(), version.record_len());
        Ok(buf)
    }

    /// Read one record.  The tag is consumed first; any value other than 1
    /// or 2 is rejected without reading further.
    pub fn read<R: Read>(mut reader: R) -> Result<Self, ContainerError> {
        let version = WireVersion::from_tag(reader.read_u8().map_err(truncated)?)?;

        let offset = reader.read_i64::<LittleEndian>().map_err(truncated)?;
        let length = match version {
            WireVersion::V1 => reader.read_u32::<LittleEndian>().map_err(truncated)? as u64,
            WireVersion::V2 => {
                let raw = reader.read_i64::<LittleEndian>().map_err(truncated)?;
                u64::try_from(raw).map_err(|_| ContainerError::FieldOverflow {
                    field: "length",
                    value: raw as u64,
                })?
            }
        };
        let raw_flags = reader.read_u16::<LittleEndian>().map_err(truncated)?;

        let offset = u64::try_from(offset).map_err(|_| ContainerError::FieldOverflow {
            field: "offset",
            value: offset as u64,
        })?;

        Ok(Self { offset, length, type_and_flags: TypeAndFlags::from_raw(raw_flags) })
    }

    /// Decode one record from the front of `bytes`, returning the header and
    /// the number of bytes it occupied.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ContainerError> {
        let mut cursor = bytes;
        let header = Self::read(&mut cursor)?;
        Ok((header, bytes.len() - cursor.len()))
    }
}

fn signed_field(field: &'static str, value: u64) -> Result<i64, ContainerError> {
    i64::try_from(value).map_err(|_| ContainerError::FieldOverflow { field, value })
}

fn truncated(err: io::Error) -> ContainerError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ContainerError::TruncatedHeader
    } else {
        err.into()
    }
}
