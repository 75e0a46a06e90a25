//! # BGRT (Boot Graphics Resource Table)

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::format::le_value_any;
use crate::report::Report;
use crate::{Session, Table};
use bitfield_struct::bitfield;

#[bitfield(u8)]
pub struct BgrtStatus {
    pub displayed: bool,
    /// Clockwise rotation in multiples of 90 degrees.
    #[bits(2)]
    pub orientation_offset: u8,
    #[bits(5)]
    pub reserved: u8,
}

fn validate_status(report: &mut Report<'_>, bytes: &[u8]) {
    let status = BgrtStatus::from_bits(u8::try_from(le_value_any(bytes)).unwrap_or(0));
    if status.reserved() != 0 {
        report_error!(report, "BGRT Status reserved bits [7:3] must be zero.");
    }
}

pub const BGRT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Version", 2, 36).check(Validator::OneOf(&[1])),
    Field::hex("Status", 1, 38).check_with(validate_status),
    Field::hex("Image Type", 1, 39).check(Validator::Zero),
    Field::hex("Image Address", 8, 40),
    Field::dec("Image Offset X", 4, 48),
    Field::dec("Image Offset Y", 4, 52),
];

pub const SCHEMAS: &[NamedSchema] = &[("BGRT", BGRT_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let _ = parse_fixed(session.report(), "BGRT", table.bytes, BGRT_FIELDS);
}
