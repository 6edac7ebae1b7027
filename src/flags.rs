//! The 16-bit `type_and_flags` field of an item header.
//!
//! ```text
//!  15  14 | 13       | 12       | 11 ........................ 0
//!  rsvd   | ASSURED  | GZIPPED  | type code (0..=4095)
//! ```
//!
//! The type code and each flag occupy disjoint bits, so extracting one never
//! depends on the value of another.  Reserved bits 14–15 are never produced by
//! [`TypeAndFlags::pack`] but are carried unchanged when a value is read off
//! the wire with [`TypeAndFlags::from_raw`].

use serde::Serialize;

use crate::error::ContainerError;

/// Mask selecting the 12-bit type code.
pub const TYPE_MASK: u16 = 0x0FFF;
/// Largest type code that fits in the field.
pub const MAX_TYPE_CODE: u16 = TYPE_MASK;
/// Bits 14–15, unassigned.
pub const RESERVED_MASK: u16 = 0xC000;

bitflags::bitflags! {
    /// Per-item storage flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u16 {
        /// Payload is gzip-compressed; `length` counts compressed bytes.
        const GZIPPED = 0x1000;
        /// Payload carries a trailing digest verified on read.
        const ASSURED = 0x2000;
    }
}

/// Packed type code plus flags, exactly as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct TypeAndFlags(u16);

impl TypeAndFlags {
    /// Combine a type code with a flag set.
    ///
    /// Fails with a range error when `type_code` needs more than 12 bits or
    /// `flags` carries bits outside [`ItemFlags::all`].
    pub fn pack(type_code: u16, flags: ItemFlags) -> Result<Self, ContainerError> {
        if type_code > MAX_TYPE_CODE {
            return Err(ContainerError::TypeCodeOutOfRange(type_code));
        }
        let unknown = flags.bits() & !ItemFlags::all().bits();
        if unknown != 0 {
            return Err(ContainerError::UnknownFlags(unknown));
        }
        Ok(Self(type_code | flags.bits()))
    }

    /// Adopt a raw wire value verbatim, reserved bits included.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn type_code(self) -> u16 {
        self.0 & TYPE_MASK
    }

    /// Recognised flags only; reserved bits are dropped.
    pub const fn flags(self) -> ItemFlags {
        ItemFlags::from_bits_truncate(self.0)
    }

    pub const fn reserved(self) -> u16 {
        self.0 & RESERVED_MASK
    }

    pub fn has_flag(self, flag: ItemFlags) -> bool {
        self.flags().contains(flag)
    }
}

impl From<TypeAndFlags> for u16 {
    fn from(value: TypeAndFlags) -> Self {
        value.0
    }
}

// ── Free-function forms ──────────────────────────────────────────────────────

/// Pack `type_code` and `flags` into a raw 16-bit field.
pub fn pack(type_code: u16, flags: ItemFlags) -> Result<u16, ContainerError> {
    TypeAndFlags::pack(type_code, flags).map(TypeAndFlags::raw)
}

/// Extract the type code, masking off every flag and reserved bit.
pub fn type_of(raw: u16) -> u16 {
    TypeAndFlags::from_raw(raw).type_code()
}

/// Test whether `flag` is set in a raw field.
pub fn has_flag(raw: u16, flag: ItemFlags) -> bool {
    TypeAndFlags::from_raw(raw).has_flag(flag)
}
