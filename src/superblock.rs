//! Fixed-size container preamble.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "MSTR"
//!      4     4  format_version (u32 LE)
//!      8    16  container_uuid
//!     24     8  directory_offset (u64 LE)
//!     32     8  directory_size (u64 LE)
//!     40     1  integrity algorithm id
//!     41     7  reserved, zero
//! ```
//!
//! Writers reserve the block as zeroes and patch it once the directory has
//! been written, so a container whose writer never finished is rejected on
//! the magic check.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use uuid::Uuid;

use crate::error::ContainerError;
use crate::integrity::IntegrityAlgorithm;

pub const MAGIC: &[u8; 4] = b"MSTR";
pub const FORMAT_VERSION: u32 = 1;
pub const SUPERBLOCK_SIZE: usize = 48;

#[derive(Debug, Clone)]
pub struct Superblock {
    pub magic:            [u8; 4],
    pub format_version:   u32,
    pub container_uuid:   Uuid,
    pub directory_offset: u64,
    pub directory_size:   u64,
    pub integrity:        IntegrityAlgorithm,
}

impl Superblock {
    pub fn new(integrity: IntegrityAlgorithm) -> Self {
        Self {
            magic:            *MAGIC,
            format_version:   FORMAT_VERSION,
            container_uuid:   Uuid::new_v4(),
            directory_offset: 0,
            directory_size:   0,
            integrity,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.format_version)?;
        writer.write_all(self.container_uuid.as_bytes())?;
        writer.write_u64::<LittleEndian>(self.directory_offset)?;
        writer.write_u64::<LittleEndian>(self.directory_size)?;
        writer.write_u8(self.integrity.id())?;
        writer.write_all(&[0u8; 7])?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, ContainerError> {
        let mut block = [0u8; SUPERBLOCK_SIZE];
        reader.read_exact(&mut block).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ContainerError::TruncatedSuperblock,
            _ => e.into(),
        })?;
        let mut cursor = &block[..];

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ContainerError::InvalidMagic);
        }
        let format_version = cursor.read_u32::<LittleEndian>()?;
        if format_version != FORMAT_VERSION {
            return Err(ContainerError::UnsupportedFormatVersion(format_version));
        }
        let mut uuid_bytes = [0u8; 16];
        cursor.read_exact(&mut uuid_bytes)?;
        let directory_offset = cursor.read_u64::<LittleEndian>()?;
        let directory_size = cursor.read_u64::<LittleEndian>()?;
        let integrity = IntegrityAlgorithm::from_id(cursor.read_u8()?)?;

        Ok(Self {
            magic,
            format_version,
            container_uuid: Uuid::from_bytes(uuid_bytes),
            directory_offset,
            directory_size,
            integrity,
        })
    }
}
