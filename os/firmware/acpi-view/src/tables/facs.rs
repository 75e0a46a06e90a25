//! FACS (Firmware ACPI Control Structure).
//!
//! Has its own 64-byte layout without the common header and no checksum.

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::{Session, Table};

pub const FACS_FIELDS: &[Field] = &[
    Field::chars("Signature", 4, 0),
    Field::dec("Length", 4, 4).check(Validator::OneOf(&[64])),
    Field::hex("Hardware Signature", 4, 8),
    Field::hex("Firmware Waking Vector", 4, 12),
    Field::hex("Global Lock", 4, 16),
    Field::hex("Flags", 4, 20),
    Field::hex("X Firmware Waking Vector", 8, 24),
    Field::dec("Version", 1, 32),
    Field::reserved(3, 33),
    Field::hex("OSPM Flags", 4, 36),
    Field::reserved(24, 40),
];

pub const SCHEMAS: &[NamedSchema] = &[("FACS", FACS_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let _ = parse_fixed(session.report(), "FACS", table.bytes, FACS_FIELDS);
}
