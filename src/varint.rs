//! 7-bit-group variable-length integers.
//!
//! Used for auxiliary payload fields.  Item headers deliberately do not use
//! it; their fields are fixed-width so record sizes are known from the tag.
//!
//! Each byte carries seven value bits, low group first; bit 7 set means
//! another byte follows.  Negative `i32` values are written as their `u32`
//! bit pattern and always take five bytes.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Longest encoding of a 32-bit value.
pub const MAX_SMART_INT_LEN: usize = 5;

pub trait BinaryWriteExt: Write {
    /// Write `value` as a 7-bit-group integer, returning the byte count.
    fn write_smart_int(&mut self, value: i32) -> io::Result<usize> {
        let mut v = value as u32;
        let mut written = 1;
        while v >= 0x80 {
            self.write_u8((v as u8) | 0x80)?;
            v >>= 7;
            written += 1;
        }
        self.write_u8(v as u8)?;
        Ok(written)
    }

    /// Write a length-prefixed byte array.
    fn write_byte_array(&mut self, value: &[u8]) -> io::Result<usize> {
        let len = i32::try_from(value.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "byte array longer than i32::MAX")
        })?;
        let prefix = self.write_smart_int(len)?;
        self.write_all(value)?;
        Ok(prefix + value.len())
    }
}

impl<W: Write + ?Sized> BinaryWriteExt for W {}

pub trait BinaryReadExt: Read {
    fn read_smart_int(&mut self) -> io::Result<i32> {
        let mut value = 0u32;
        for i in 0..MAX_SMART_INT_LEN {
            let byte = self.read_u8()?;
            // the fifth group only has room for the top four bits
            if i == MAX_SMART_INT_LEN - 1 && byte > 0x0F {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "smart int overflows 32 bits"));
            }
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(io::Error::new(io::ErrorKind::InvalidData, "smart int overflows 32 bits"))
    }

    fn read_byte_array(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_smart_int()?;
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative byte array length"))?;
        let mut out = Vec::new();
        (&mut *self).take(len as u64).read_to_end(&mut out)?;
        if out.len() != len {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(out)
    }
}

impl<R: Read + ?Sized> BinaryReadExt for R {}
