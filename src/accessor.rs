//! Opening a sub-stream as a bounded, decoded byte stream.
//!
//! Layers, innermost first:
//!
//! 1. [`BoundedReader`]: exactly `length` bytes starting at `offset` of the
//!    backing stream.
//! 2. gzip decoder, only when the header carries `GZIPPED`.
//! 3. [`VerifyingReader`], only when the header carries `ASSURED`.
//!
//! The accessor borrows the backing stream mutably for as long as the view
//! lives.  A backing stream with a single shared cursor therefore serves one
//! open sub-stream at a time; concurrent readers need their own handles.

use std::io::{self, Read, Seek, SeekFrom};

use crate::codec::{get_codec, CodecId};
use crate::error::ContainerError;
use crate::header::ItemHeader;
use crate::integrity::{IntegrityAlgorithm, VerifyingReader};

// ── Bounded view ─────────────────────────────────────────────────────────────

/// A window of `length` bytes over a seekable stream.
///
/// `read` returns `Ok(0)` once the window is exhausted, so the view works with
/// `read_to_end` and `io::copy`.  `read_exact` asking for more than what is
/// left fails with an underrun error and consumes nothing.  If the backing
/// stream ends before the window does, that is an underrun too.
pub struct BoundedReader<'a, R: Read + Seek + ?Sized> {
    inner:     &'a mut R,
    length:    u64,
    remaining: u64,
}

impl<'a, R: Read + Seek + ?Sized> BoundedReader<'a, R> {
    pub fn new(inner: &'a mut R, offset: u64, length: u64) -> Result<Self, ContainerError> {
        inner.seek(SeekFrom::Start(offset))?;
        Ok(Self { inner, length, remaining: length })
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.length - self.remaining
    }

    fn underrun(&self, requested: usize) -> io::Error {
        ContainerError::Underrun { requested: requested as u64, remaining: self.remaining }.into_io()
    }
}

impl<R: Read + Seek + ?Sized> Read for BoundedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(self.underrun(max));
        }
        self.remaining -= n as u64;
        Ok(n)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() as u64 > self.remaining {
            return Err(self.underrun(buf.len()));
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// ── Decoded view ─────────────────────────────────────────────────────────────

/// An opened sub-stream, with every flag-selected layer applied.
///
/// `read_exact` past the end of the decoded bytes fails with an underrun
/// error whatever the flags.
pub struct Substream<'a> {
    header:  ItemHeader,
    inner:   Box<dyn Read + 'a>,
    layered: bool,
}

impl Substream<'_> {
    pub fn header(&self) -> &ItemHeader {
        &self.header
    }
}

impl Read for Substream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        // a plain view is the bounded reader itself, which knows what is left
        if !self.layered {
            return self.inner.read_exact(buf);
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    let requested = (buf.len() - filled) as u64;
                    return Err(ContainerError::Underrun { requested, remaining: 0 }.into_io());
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// ── Accessor ─────────────────────────────────────────────────────────────────

/// Opens sub-streams described by item headers.
///
/// The digest algorithm for `ASSURED` items is a property of the container
/// and is fixed per accessor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstreamAccessor {
    integrity: IntegrityAlgorithm,
}

impl SubstreamAccessor {
    pub fn new(integrity: IntegrityAlgorithm) -> Self {
        Self { integrity }
    }

    pub fn integrity(&self) -> IntegrityAlgorithm {
        self.integrity
    }

    pub fn open<'a, R>(&self, header: &ItemHeader, backing: &'a mut R) -> Result<Substream<'a>, ContainerError>
    where
        R: Read + Seek + ?Sized + 'a,
    {
        let codec = CodecId::for_flags(header.flags());
        tracing::trace!(
            offset = header.offset,
            length = header.length,
            type_code = header.type_code(),
            codec = codec.name(),
            assured = header.is_assured(),
            "opening sub-stream"
        );

        let bounded: Box<dyn Read + 'a> =
            Box::new(BoundedReader::new(backing, header.offset, header.length)?);
        let mut inner = get_codec(codec).decoder(bounded);
        if header.is_assured() {
            inner = Box::new(VerifyingReader::new(inner, self.integrity));
        }
        let layered = codec != CodecId::None || header.is_assured();
        Ok(Substream { header: *header, inner, layered })
    }

    /// Open and drain a sub-stream.  Integrity is checked before returning.
    pub fn read_all<R>(&self, header: &ItemHeader, backing: &mut R) -> Result<Vec<u8>, ContainerError>
    where
        R: Read + Seek + ?Sized,
    {
        let mut out = Vec::new();
        self.open(header, backing)?.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Open `header` over `backing` with the default (BLAKE3) integrity algorithm.
pub fn open<'a, R>(header: &ItemHeader, backing: &'a mut R) -> Result<Substream<'a>, ContainerError>
where
    R: Read + Seek + ?Sized + 'a,
{
    SubstreamAccessor::default().open(header, backing)
}
