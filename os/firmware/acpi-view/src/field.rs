//! # Field descriptors
//!
//! A schema is an ordered `&'static [Field]` describing one binary record.
//! Each [`Field`] knows its name, byte length and byte offset, how to render
//! its value ([`Render`]) and, optionally, how to validate it
//! ([`Validator`]). Schemas are plain data; the [`walker`](crate::walker)
//! interprets them.
//!
//! Fields are listed in ascending offset order and each offset equals the sum
//! of the lengths of the fields before it. The walker reports any schema that
//! breaks this rule.

use crate::Report;
use crate::format::le_value;
use alloc::vec::Vec;

/// Custom value renderer. Receives the raw field bytes.
pub type Renderer = fn(&mut Report<'_>, &[u8]);

/// Custom validator. Receives the raw field bytes and reports findings
/// through the [`Report`] itself.
pub type Check = fn(&mut Report<'_>, &[u8]);

/// Display format for integer fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntFormat {
    /// `0x1F`
    Hex,
    /// `31`
    Dec,
}

/// How the walker renders a field value.
#[derive(Copy, Clone)]
pub enum Render {
    /// Little-endian unsigned integer; the field length must be 1, 2, 4 or 8.
    Int(IntFormat),
    /// Fixed-length run of ASCII characters (OEM IDs, signatures).
    Chars,
    /// Bytes printed as space separated hex pairs.
    Bytes,
    /// A sub-record traced field by field on the following lines.
    Nested(&'static [Field]),
    /// Value printed by a custom function.
    Custom(Renderer),
    /// Name only, the value is not printed.
    Silent,
}

/// Value constraint checked while tracing.
#[derive(Copy, Clone)]
pub enum Validator {
    /// Reserved field that must read as zero.
    Zero,
    /// The value must not exceed the bound.
    AtMost(u64),
    /// The value must be one of the listed values.
    OneOf(&'static [u64]),
    Custom(Check),
}

/// Descriptor for one field of a binary record.
#[derive(Copy, Clone)]
pub struct Field {
    pub name: &'static str,
    pub length: usize,
    pub offset: usize,
    pub render: Render,
    pub validate: Option<Validator>,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, length: usize, offset: usize, render: Render) -> Self {
        Self {
            name,
            length,
            offset,
            render,
            validate: None,
        }
    }

    #[must_use]
    pub const fn hex(name: &'static str, length: usize, offset: usize) -> Self {
        Self::new(name, length, offset, Render::Int(IntFormat::Hex))
    }

    #[must_use]
    pub const fn dec(name: &'static str, length: usize, offset: usize) -> Self {
        Self::new(name, length, offset, Render::Int(IntFormat::Dec))
    }

    #[must_use]
    pub const fn chars(name: &'static str, length: usize, offset: usize) -> Self {
        Self::new(name, length, offset, Render::Chars)
    }

    #[must_use]
    pub const fn bytes(name: &'static str, length: usize, offset: usize) -> Self {
        Self::new(name, length, offset, Render::Bytes)
    }

    /// Reserved field: printed as hex bytes and checked to be zero.
    #[must_use]
    pub const fn reserved(length: usize, offset: usize) -> Self {
        let render = if length <= 8 && length.is_power_of_two() {
            Render::Int(IntFormat::Hex)
        } else {
            Render::Bytes
        };
        Self::new("Reserved", length, offset, render).check(Validator::Zero)
    }

    /// A 12-byte Generic Address Structure.
    #[must_use]
    pub const fn gas(name: &'static str, offset: usize) -> Self {
        Self::new(name, 12, offset, Render::Nested(crate::format::GAS_FIELDS))
    }

    #[must_use]
    pub const fn nested(
        name: &'static str,
        length: usize,
        offset: usize,
        schema: &'static [Field],
    ) -> Self {
        Self::new(name, length, offset, Render::Nested(schema))
    }

    #[must_use]
    pub const fn custom(name: &'static str, length: usize, offset: usize, f: Renderer) -> Self {
        Self::new(name, length, offset, Render::Custom(f))
    }

    #[must_use]
    pub const fn silent(name: &'static str, length: usize, offset: usize) -> Self {
        Self::new(name, length, offset, Render::Silent)
    }

    /// Attach a validator.
    #[must_use]
    pub const fn check(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Attach a custom validator function.
    #[must_use]
    pub const fn check_with(self, f: Check) -> Self {
        self.check(Validator::Custom(f))
    }

    /// Offset one past the last byte of the field.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Total length of a schema, taken from its last field.
#[must_use]
pub fn schema_len(schema: &[Field]) -> usize {
    schema.last().map_or(0, Field::end)
}

/// Result of walking a schema over a buffer.
///
/// Holds the number of bytes covered by the fields that fit, and the raw bytes
/// of each of those fields so that callers can read the values that govern the
/// rest of the parse (lengths, counts, offsets).
#[derive(Debug, Clone, Default)]
pub struct Parsed<'a> {
    consumed: usize,
    fields: Vec<(&'static str, &'a [u8])>,
}

impl<'a> Parsed<'a> {
    pub(crate) const fn new() -> Self {
        Self {
            consumed: 0,
            fields: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &'static str, bytes: &'a [u8]) {
        self.consumed += bytes.len();
        self.fields.push((name, bytes));
    }

    /// Number of bytes covered by the visited fields.
    #[inline]
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of fields visited.
    #[inline]
    #[must_use]
    pub fn visited(&self) -> usize {
        self.fields.len()
    }

    /// Raw bytes of the first visited field with the given name.
    #[must_use]
    pub fn bytes(&self, name: &str) -> Option<&'a [u8]> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| *b)
    }

    /// Little-endian value of a field up to 8 bytes wide.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<u64> {
        self.bytes(name).and_then(le_value)
    }

    #[must_use]
    pub fn u8(&self, name: &str) -> Option<u8> {
        self.value(name).and_then(|v| u8::try_from(v).ok())
    }

    #[must_use]
    pub fn u16(&self, name: &str) -> Option<u16> {
        self.value(name).and_then(|v| u16::try_from(v).ok())
    }

    #[must_use]
    pub fn u32(&self, name: &str) -> Option<u32> {
        self.value(name).and_then(|v| u32::try_from(v).ok())
    }

    #[must_use]
    pub fn u64(&self, name: &str) -> Option<u64> {
        self.value(name)
    }

    /// Value as a `usize` offset or length.
    #[must_use]
    pub fn usize(&self, name: &str) -> Option<usize> {
        self.value(name).and_then(|v| usize::try_from(v).ok())
    }
}
