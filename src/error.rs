//! Crate-wide error type.
//!
//! Every failure maps onto one [`ErrorKind`] class so callers can branch on
//! the class without matching individual variants.  Errors raised inside a
//! `std::io::Read` adapter travel as an `io::Error` wrapping a
//! [`ContainerError`]; `From<io::Error>` unwraps them again so `?` restores
//! the original variant.

use std::io;
use thiserror::Error;

use crate::codec::CodecError;

/// Coarse classification of a [`ContainerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or unsupported bytes on the wire.
    Format,
    /// A type code or flag set that cannot be packed.
    Range,
    /// A directory entry whose byte range intersects an existing one.
    Overlap,
    /// Directory lookup outside `[0, count)`.
    Index,
    /// Read past the declared end of a sub-stream.
    Underrun,
    /// Digest mismatch on an assured sub-stream.
    Integrity,
    /// Failure of the backing storage or a collaborator, surfaced as-is.
    Io,
}

#[derive(Error, Debug)]
pub enum ContainerError {
    // ── Format ───────────────────────────────────────────────────────────────
    #[error("Unknown item header version tag: {0}")]
    UnknownVersion(u8),
    #[error("Truncated item header")]
    TruncatedHeader,
    #[error("Invalid magic number")]
    InvalidMagic,
    #[error("Truncated superblock")]
    TruncatedSuperblock,
    #[error("Unsupported container format version: {0}")]
    UnsupportedFormatVersion(u32),
    #[error("Unknown integrity algorithm id: {0}")]
    UnknownIntegrity(u8),
    #[error("{field} value {value} does not fit its wire field")]
    FieldOverflow { field: &'static str, value: u64 },
    #[error("Region at offset {offset} with length {length} extends past stream end {stream_len}")]
    ExtentBeyondStream { offset: u64, length: u64, stream_len: u64 },
    #[error("Entry {index} at offset {offset} with length {length} lies inside the {region}")]
    ReservedRegion { index: usize, offset: u64, length: u64, region: &'static str },

    // ── Range ────────────────────────────────────────────────────────────────
    #[error("Type code {0} does not fit in 12 bits")]
    TypeCodeOutOfRange(u16),
    #[error("Unrecognised flag bits {0:#06x}")]
    UnknownFlags(u16),

    // ── Directory ────────────────────────────────────────────────────────────
    #[error("Range {offset}..{end} overlaps entry {existing} at {existing_offset}..{existing_end}")]
    Overlap {
        offset:          u64,
        end:             u64,
        existing:        usize,
        existing_offset: u64,
        existing_end:    u64,
    },
    #[error("Directory index {index} out of bounds (count {count})")]
    IndexOutOfBounds { index: usize, count: usize },

    // ── Access ───────────────────────────────────────────────────────────────
    #[error("Read past end of sub-stream: requested {requested} byte(s), {remaining} remaining")]
    Underrun { requested: u64, remaining: u64 },
    #[error("Integrity check failed ({algorithm}): stored {expected}, computed {actual}")]
    IntegrityMismatch {
        algorithm: &'static str,
        expected:  String,
        actual:    String,
    },
    #[error("Assured payload is shorter than its {algorithm} digest ({needed} bytes)")]
    DigestMissing { algorithm: &'static str, needed: usize },

    // ── Pass-through ─────────────────────────────────────────────────────────
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl ContainerError {
    pub fn kind(&self) -> ErrorKind {
        use ContainerError::*;
        match self {
            UnknownVersion(_)
            | TruncatedHeader
            | InvalidMagic
            | TruncatedSuperblock
            | UnsupportedFormatVersion(_)
            | UnknownIntegrity(_)
            | FieldOverflow { .. }
            | ExtentBeyondStream { .. }
            | ReservedRegion { .. } => ErrorKind::Format,
            TypeCodeOutOfRange(_) | UnknownFlags(_) => ErrorKind::Range,
            Overlap { .. } => ErrorKind::Overlap,
            IndexOutOfBounds { .. } => ErrorKind::Index,
            Underrun { .. } => ErrorKind::Underrun,
            IntegrityMismatch { .. } | DigestMissing { .. } => ErrorKind::Integrity,
            Codec(_) | Io(_) => ErrorKind::Io,
        }
    }

    /// Wrap into an `io::Error` so the error can cross a `Read` boundary.
    pub(crate) fn into_io(self) -> io::Error {
        let kind = match self.kind() {
            ErrorKind::Underrun => io::ErrorKind::UnexpectedEof,
            ErrorKind::Io => match self {
                ContainerError::Io(e) => return e,
                _ => io::ErrorKind::Other,
            },
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, self)
    }
}

impl From<io::Error> for ContainerError {
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<ContainerError>()) {
            return ContainerError::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<ContainerError>()) {
            Some(Ok(inner))  => *inner,
            Some(Err(other)) => ContainerError::Io(io::Error::new(kind, other)),
            None             => ContainerError::Io(kind.into()),
        }
    }
}

impl From<ContainerError> for io::Error {
    fn from(err: ContainerError) -> Self {
        err.into_io()
    }
}
