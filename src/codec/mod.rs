//! Compression collaborators selected by item flags.
//!
//! The container format does not define a compression algorithm of its own.
//! A sub-stream is either stored verbatim or, when its header carries
//! [`ItemFlags::GZIPPED`], as a single gzip member.  The header `length`
//! always counts the bytes on the wire, i.e. the *compressed* size; the
//! decompressed size is not recorded anywhere.
//!
//! Writers compress whole payloads in memory; readers decompress as a
//! stream so a sub-stream never has to be materialised to be read.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::flags::ItemFlags;

/// Default gzip level used by writers.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

// ── CodecId ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    None,
    Gzip,
}

impl CodecId {
    /// The codec a sub-stream with `flags` was written with.
    pub fn for_flags(flags: ItemFlags) -> Self {
        if flags.contains(ItemFlags::GZIPPED) { CodecId::Gzip } else { CodecId::None }
    }

    /// Human-readable name, for diagnostics only.
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None => "none",
            CodecId::Gzip => "gzip",
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>, CodecError>;
    /// Wrap `input` in a streaming decoder.
    fn decoder<'a>(&self, input: Box<dyn Read + 'a>) -> Box<dyn Read + 'a>;
}

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8], _: u32) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
    fn decoder<'a>(&self, input: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> { input }
}

pub struct GzipCodec;
impl Codec for GzipCodec {
    fn codec_id(&self) -> CodecId { CodecId::Gzip }

    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>, CodecError> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
        enc.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        enc.finish().map_err(|e| CodecError::Compression(e.to_string()))
    }

    fn decoder<'a>(&self, input: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        Box::new(GzDecoder::new(input))
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::None => Box::new(NoneCodec),
        CodecId::Gzip => Box::new(GzipCodec),
    }
}
