//! Digest collaborators for assured sub-streams.
//!
//! An assured payload is the caller's bytes followed by their digest:
//!
//! ```text
//! [ data ... | digest (digest_len B) ]
//! ```
//!
//! The digest is computed over the uncompressed data, and sealing happens
//! before compression, so on a `GZIPPED | ASSURED` item the digest lives
//! inside the gzip member.  [`VerifyingReader`] hands the data through while
//! withholding the trailing `digest_len` bytes, and compares only when the
//! inner stream reports end-of-data.  A mismatch therefore surfaces on the
//! read that hits the end, never earlier.

use serde::Serialize;
use std::io::{self, Read};

use crate::error::ContainerError;

const READ_CHUNK: usize = 8 * 1024;

// ── Algorithms ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum IntegrityAlgorithm {
    Blake3 = 1,
    Crc32  = 2,
}

impl Default for IntegrityAlgorithm {
    fn default() -> Self {
        IntegrityAlgorithm::Blake3
    }
}

impl IntegrityAlgorithm {
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, ContainerError> {
        match id {
            1 => Ok(IntegrityAlgorithm::Blake3),
            2 => Ok(IntegrityAlgorithm::Crc32),
            other => Err(ContainerError::UnknownIntegrity(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegrityAlgorithm::Blake3 => "blake3",
            IntegrityAlgorithm::Crc32  => "crc32",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "blake3" => Some(IntegrityAlgorithm::Blake3),
            "crc32"  => Some(IntegrityAlgorithm::Crc32),
            _        => None,
        }
    }

    pub fn digest_len(self) -> usize {
        match self {
            IntegrityAlgorithm::Blake3 => blake3::OUT_LEN,
            IntegrityAlgorithm::Crc32  => 4,
        }
    }

    pub fn hasher(self) -> Box<dyn IntegrityHasher> {
        match self {
            IntegrityAlgorithm::Blake3 => Box::new(Blake3Hasher(blake3::Hasher::new())),
            IntegrityAlgorithm::Crc32  => Box::new(Crc32Hasher(crc32fast::Hasher::new())),
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Incremental digest state.
pub trait IntegrityHasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

struct Blake3Hasher(blake3::Hasher);
impl IntegrityHasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self: Box<Self>) -> Vec<u8> { self.0.finalize().as_bytes().to_vec() }
}

struct Crc32Hasher(crc32fast::Hasher);
impl IntegrityHasher for Crc32Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self: Box<Self>) -> Vec<u8> { self.0.finalize().to_le_bytes().to_vec() }
}

/// Append the digest of `data` to a copy of it.
pub fn seal(algorithm: IntegrityAlgorithm, data: &[u8]) -> Vec<u8> {
    let digest = algorithm.digest(data);
    let mut out = Vec::with_capacity(data.len() + digest.len());
    out.extend_from_slice(data);
    out.extend_from_slice(&digest);
    out
}

/// Lowercase hexadecimal rendering of a digest.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

// ── Verifying reader ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Failure {
    Missing,
    Mismatch { expected: String, actual: String },
}

enum State {
    Streaming(Box<dyn IntegrityHasher>),
    Verified,
    Failed(Failure),
}

pub struct VerifyingReader<R: Read> {
    inner:     R,
    algorithm: IntegrityAlgorithm,
    window:    Vec<u8>,
    state:     State,
}

impl<R: Read> VerifyingReader<R> {
    pub fn new(inner: R, algorithm: IntegrityAlgorithm) -> Self {
        Self {
            inner,
            algorithm,
            window: Vec::with_capacity(READ_CHUNK + algorithm.digest_len()),
            state:  State::Streaming(algorithm.hasher()),
        }
    }

    /// True once the trailing digest has been checked and matched.
    pub fn is_verified(&self) -> bool {
        matches!(self.state, State::Verified)
    }

    fn failure_error(&self, failure: &Failure) -> io::Error {
        let err = match failure.clone() {
            Failure::Missing => ContainerError::DigestMissing {
                algorithm: self.algorithm.name(),
                needed:    self.algorithm.digest_len(),
            },
            Failure::Mismatch { expected, actual } => ContainerError::IntegrityMismatch {
                algorithm: self.algorithm.name(),
                expected,
                actual,
            },
        };
        err.into_io()
    }

    /// Runs once, when the inner stream is exhausted.
    fn finish(&mut self) -> io::Result<()> {
        let hasher = match std::mem::replace(&mut self.state, State::Verified) {
            State::Streaming(h) => h,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let failure = if self.window.len() < self.algorithm.digest_len() {
            Some(Failure::Missing)
        } else {
            let actual = hasher.finalize();
            if actual == self.window {
                None
            } else {
                Some(Failure::Mismatch {
                    expected: digest_hex(&self.window),
                    actual:   digest_hex(&actual),
                })
            }
        };

        match failure {
            None => {
                tracing::trace!(algorithm = self.algorithm.name(), "sub-stream digest verified");
                Ok(())
            }
            Some(f) => {
                tracing::warn!(algorithm = self.algorithm.name(), ?f, "sub-stream digest check failed");
                let err = self.failure_error(&f);
                self.state = State::Failed(f);
                Err(err)
            }
        }
    }
}

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.state {
            State::Verified => return Ok(0),
            State::Failed(f) => return Err(self.failure_error(f)),
            State::Streaming(_) => {}
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let digest_len = self.algorithm.digest_len();
        loop {
            if self.window.len() > digest_len {
                let n = buf.len().min(self.window.len() - digest_len);
                buf[..n].copy_from_slice(&self.window[..n]);
                if let State::Streaming(hasher) = &mut self.state {
                    hasher.update(&buf[..n]);
                }
                self.window.drain(..n);
                return Ok(n);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                self.finish()?;
                return Ok(0);
            }
            self.window.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_digest_withheld_across_small_reads() {
        let sealed = seal(IntegrityAlgorithm::Blake3, b"trickled payload bytes");
        let mut reader = VerifyingReader::new(
            Trickle { data: &sealed, step: 3 },
            IntegrityAlgorithm::Blake3,
        );
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"trickled payload bytes");
        assert!(reader.is_verified());
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut sealed = seal(IntegrityAlgorithm::Crc32, b"abc");
        sealed[0] ^= 0xFF;
        let mut reader = VerifyingReader::new(&sealed[..], IntegrityAlgorithm::Crc32);
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
        let err = reader.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!reader.is_verified());
    }

    #[test]
    fn test_empty_data_still_carries_digest() {
        let sealed = seal(IntegrityAlgorithm::Crc32, b"");
        assert_eq!(sealed.len(), 4);
        let mut out = Vec::new();
        VerifyingReader::new(&sealed[..], IntegrityAlgorithm::Crc32)
            .read_to_end(&mut out)
            .unwrap();
        assert!(out.is_empty());
    }
}
