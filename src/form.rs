//! Form body encoder for uploading containers.
//!
//! Produces an `application/x-www-form-urlencoded` or `multipart/form-data`
//! request body into any [`Write`] sink.  Sending the body (method, headers,
//! transport) is left to whichever HTTP client the caller uses; pair the body
//! with [`FormWriter::content_type`].

use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

const NETWORK_EOL: &str = "\r\n";

/// Content type used by [`FormWriter::add_file`] callers that have none.
pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEncoding {
    UrlEncoded,
    Multipart,
}

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Form key must not be empty")]
    EmptyKey,
    #[error("Value for form key '{0}' must not be empty")]
    EmptyValue(String),
    #[error("Form key '{0}' contains characters other than ASCII letters and digits")]
    UnsafeKey(String),
    #[error("{op} is not supported for {encoding:?} bodies")]
    Unsupported { op: &'static str, encoding: FormEncoding },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub struct FormWriter<W: Write> {
    sink:       W,
    encoding:   FormEncoding,
    boundary:   String,
    next_field: bool,
}

impl<W: Write> FormWriter<W> {
    pub fn new(sink: W, encoding: FormEncoding) -> Self {
        Self::with_boundary(sink, encoding, Uuid::new_v4().simple().to_string())
    }

    /// Use a fixed multipart boundary instead of a random one.
    pub fn with_boundary(sink: W, encoding: FormEncoding, boundary: impl Into<String>) -> Self {
        Self { sink, encoding, boundary: boundary.into(), next_field: false }
    }

    pub fn encoding(&self) -> FormEncoding {
        self.encoding
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        match self.encoding {
            FormEncoding::UrlEncoded => "application/x-www-form-urlencoded".to_string(),
            FormEncoding::Multipart  => format!("multipart/form-data; boundary={}", self.boundary),
        }
    }

    pub fn add_value(&mut self, key: &str, value: &str) -> Result<(), FormError> {
        if key.is_empty() {
            return Err(FormError::EmptyKey);
        }
        if value.is_empty() {
            return Err(FormError::EmptyValue(key.to_string()));
        }
        match self.encoding {
            FormEncoding::UrlEncoded => {
                if self.next_field {
                    self.sink.write_all(b"&")?;
                }
                self.next_field = true;
                write!(self.sink, "{}={}", url_encode(key), url_encode(value))?;
                Ok(())
            }
            FormEncoding::Multipart => self.add_bytes(key, value.as_bytes()),
        }
    }

    /// Add a binary field.  Multipart only.
    pub fn add_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), FormError> {
        self.check_multipart("add_bytes", key)?;
        self.write_boundary()?;
        write!(self.sink, "Content-Disposition: form-data; name=\"{key}\"{NETWORK_EOL}{NETWORK_EOL}")?;
        self.sink.write_all(value)?;
        self.sink.write_all(NETWORK_EOL.as_bytes())?;
        Ok(())
    }

    /// Stream a file part from `reader`.  Multipart only.  `filename` is
    /// reduced to its final path component.
    pub fn add_file<R: Read>(
        &mut self,
        key:          &str,
        filename:     &str,
        reader:       &mut R,
        content_type: &str,
    ) -> Result<u64, FormError> {
        self.check_multipart("add_file", key)?;
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| FormError::EmptyValue(key.to_string()))?;

        self.write_boundary()?;
        write!(
            self.sink,
            "Content-Disposition: form-data; name=\"{key}\"; filename=\"{name}\"{NETWORK_EOL}\
             Content-Type: {content_type}{NETWORK_EOL}{NETWORK_EOL}"
        )?;
        let copied = io::copy(reader, &mut self.sink)?;
        self.sink.write_all(NETWORK_EOL.as_bytes())?;
        Ok(copied)
    }

    /// Terminate the body and hand back the sink.
    pub fn finish(mut self) -> Result<W, FormError> {
        if self.encoding == FormEncoding::Multipart {
            write!(self.sink, "--{}--{NETWORK_EOL}", self.boundary)?;
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn check_multipart(&self, op: &'static str, key: &str) -> Result<(), FormError> {
        if self.encoding != FormEncoding::Multipart {
            return Err(FormError::Unsupported { op, encoding: self.encoding });
        }
        if key.is_empty() {
            return Err(FormError::EmptyKey);
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FormError::UnsafeKey(key.to_string()));
        }
        Ok(())
    }

    fn write_boundary(&mut self) -> io::Result<()> {
        write!(self.sink, "--{}{NETWORK_EOL}", self.boundary)
    }
}

/// `application/x-www-form-urlencoded` escaping: ASCII letters and digits
/// pass through, space becomes `+`, every other UTF-8 byte becomes `%XX`.
pub fn url_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b if b.is_ascii_alphanumeric() => out.push(b as char),
            b' ' => out.push('+'),
            b => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
