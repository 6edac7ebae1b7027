//! Streaming container engine: writer and reader.
//!
//! # Writer
//! [`ContainerWriter`] reserves the superblock, then appends payloads one
//! after another.  Each payload is optionally sealed with a digest
//! (`ASSURED`) and then optionally gzip-compressed (`GZIPPED`) before it is
//! written; its item header records where the stored bytes landed.  On
//! `finalize()` the directory is written after the last payload and the
//! superblock is patched in place at offset 0.
//!
//! # Reader
//! [`ContainerReader`] reads the superblock, loads the directory, and checks
//! that every item lies inside the stream before handing anything out.
//! Items are opened through a [`SubstreamAccessor`].

use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, trace, warn};

use crate::accessor::{Substream, SubstreamAccessor};
use crate::codec::{get_codec, CodecId, DEFAULT_COMPRESSION_LEVEL};
use crate::directory::ContainerDirectory;
use crate::error::ContainerError;
use crate::flags::{ItemFlags, TypeAndFlags};
use crate::header::ItemHeader;
use crate::integrity::{seal, IntegrityAlgorithm};
use crate::superblock::{Superblock, SUPERBLOCK_SIZE};

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct ContainerWriter<W: Write + Seek> {
    writer:                W,
    pub superblock:        Superblock,
    directory:             ContainerDirectory,
    pub compression_level: u32,
    finalized:             bool,
}

impl<W: Write + Seek> ContainerWriter<W> {
    pub fn new(writer: W) -> Result<Self, ContainerError> {
        Self::with_options(writer, DEFAULT_COMPRESSION_LEVEL, IntegrityAlgorithm::default())
    }

    pub fn with_options(
        mut writer:        W,
        compression_level: u32,
        integrity:         IntegrityAlgorithm,
    ) -> Result<Self, ContainerError> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&[0u8; SUPERBLOCK_SIZE])?; // reserved; overwritten on finalize
        Ok(Self {
            writer,
            superblock: Superblock::new(integrity),
            directory: ContainerDirectory::new(),
            compression_level,
            finalized: false,
        })
    }

    pub fn directory(&self) -> &ContainerDirectory {
        &self.directory
    }

    /// Store `data` as a new sub-stream and return its directory index.
    pub fn append(
        &mut self,
        type_code: u16,
        flags:     ItemFlags,
        data:      &[u8],
    ) -> Result<usize, ContainerError> {
        let type_and_flags = TypeAndFlags::pack(type_code, flags)?;

        let sealed;
        let plain: &[u8] = if flags.contains(ItemFlags::ASSURED) {
            sealed = seal(self.superblock.integrity, data);
            &sealed
        } else {
            data
        };
        let stored = get_codec(CodecId::for_flags(flags)).compress(plain, self.compression_level)?;

        self.append_raw(type_and_flags, &stored)
    }

    /// Store `payload` verbatim under `type_and_flags`.  The caller is
    /// responsible for the payload matching the flags it claims.
    pub fn append_raw(
        &mut self,
        type_and_flags: TypeAndFlags,
        payload:        &[u8],
    ) -> Result<usize, ContainerError> {
        if self.finalized {
            return Err(finalized());
        }
        let offset = self.writer.stream_position()?;
        let header = ItemHeader::new(offset, payload.len() as u64, type_and_flags);
        header.encode()?;
        self.directory.check_overlap(&header)?;

        self.writer.write_all(payload)?;
        let index = self.directory.append(header)?;
        trace!(
            index,
            offset,
            length = header.length,
            version = header.version().tag(),
            type_code = header.type_code(),
            "appended sub-stream"
        );
        Ok(index)
    }

    /// Write the directory and patch the superblock.  Must be called once.
    pub fn finalize(&mut self) -> Result<(), ContainerError> {
        if self.finalized {
            return Err(finalized());
        }
        let directory_offset = self.writer.stream_position()?;
        let directory_size = self.directory.write_to(&mut self.writer)?;

        self.superblock.directory_offset = directory_offset;
        self.superblock.directory_size = directory_size;
        self.writer.seek(SeekFrom::Start(0))?;
        self.superblock.write(&mut self.writer)?;
        self.writer.flush()?;
        self.finalized = true;

        debug!(
            items = self.directory.len(),
            directory_offset,
            directory_size,
            "container finalized"
        );
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn finalized() -> ContainerError {
    ContainerError::Io(io::Error::new(io::ErrorKind::Other, "container already finalized"))
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct ContainerReader<R: Read + Seek> {
    reader:         R,
    pub superblock: Superblock,
    directory:      ContainerDirectory,
    accessor:       SubstreamAccessor,
}

impl<R: Read + Seek> ContainerReader<R> {
    pub fn open(mut reader: R) -> Result<Self, ContainerError> {
        reader.seek(SeekFrom::Start(0))?;
        let sb = Superblock::read(&mut reader)?;
        let stream_len = reader.seek(SeekFrom::End(0))?;

        let directory_fits = sb
            .directory_offset
            .checked_add(sb.directory_size)
            .is_some_and(|end| end <= stream_len);
        if !directory_fits {
            return Err(ContainerError::ExtentBeyondStream {
                offset: sb.directory_offset,
                length: sb.directory_size,
                stream_len,
            });
        }

        reader.seek(SeekFrom::Start(sb.directory_offset))?;
        let directory = ContainerDirectory::read_from((&mut reader).take(sb.directory_size))?;
        directory.check_extent(stream_len)?;
        directory.check_reserved(SUPERBLOCK_SIZE as u64, sb.directory_offset, sb.directory_size)?;

        debug!(
            items = directory.len(),
            stream_len,
            integrity = sb.integrity.name(),
            "opened container"
        );
        let accessor = SubstreamAccessor::new(sb.integrity);
        Ok(Self { reader, superblock: sb, directory, accessor })
    }

    pub fn directory(&self) -> &ContainerDirectory {
        &self.directory
    }

    /// Open item `index` as a bounded, decoded stream.
    pub fn open_item(&mut self, index: usize) -> Result<Substream<'_>, ContainerError> {
        let header = self.directory.get(index)?;
        self.accessor.open(&header, &mut self.reader)
    }

    pub fn read_item(&mut self, index: usize) -> Result<Vec<u8>, ContainerError> {
        let header = self.directory.get(index)?;
        self.accessor.read_all(&header, &mut self.reader)
    }

    /// Drain every assured item and report its verification outcome.
    pub fn verify_all(&mut self) -> Vec<(usize, Result<(), ContainerError>)> {
        let assured: Vec<(usize, ItemHeader)> = self
            .directory
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, h)| h.is_assured())
            .collect();

        assured
            .into_iter()
            .map(|(index, header)| {
                let outcome = self
                    .accessor
                    .open(&header, &mut self.reader)
                    .and_then(|mut s| io::copy(&mut s, &mut io::sink()).map_err(ContainerError::from))
                    .map(|_| ());
                if let Err(e) = &outcome {
                    warn!(index, error = %e, "assured item failed verification");
                }
                (index, outcome)
            })
            .collect()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_rejected_append_writes_nothing() {
        let mut w = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        let tf = TypeAndFlags::pack(1, ItemFlags::empty()).unwrap();
        // claim the bytes the next append would land on
        w.directory.append(ItemHeader::new(SUPERBLOCK_SIZE as u64, 100, tf)).unwrap();

        let err = w.append_raw(tf, b"payload").unwrap_err();
        assert!(matches!(err, ContainerError::Overlap { existing: 0, .. }));
        assert_eq!(w.writer.stream_position().unwrap(), SUPERBLOCK_SIZE as u64);
        assert_eq!(w.writer.get_ref().len(), SUPERBLOCK_SIZE);
        assert_eq!(w.directory().len(), 1);
    }
}
