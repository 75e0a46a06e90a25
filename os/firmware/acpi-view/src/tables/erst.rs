//! # ERST (Error Record Serialization Table)

use super::{NamedSchema, check_array_bounds, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::walker;
use crate::{Session, Table};

/// Size of the fields following the common header.
pub const SERIALIZATION_HEADER_SIZE: u64 = 12;

pub const ERST_FIELDS: &[Field] = acpi_header_fields![
    Field::dec("Serialization Header Size", 4, 36)
        .check(Validator::OneOf(&[SERIALIZATION_HEADER_SIZE])),
    Field::reserved(4, 40),
    Field::dec("Instruction Entry Count", 4, 44),
];

pub const SERIALIZATION_INSTRUCTION_ENTRY: &[Field] = &[
    Field::hex("Serialization Action", 1, 0).check(Validator::AtMost(0x10)),
    Field::hex("Instruction", 1, 1).check(Validator::AtMost(0x12)),
    Field::hex("Flags", 1, 2).check(Validator::AtMost(1)),
    Field::reserved(1, 3),
    Field::gas("Register Region", 4),
    Field::hex("Value", 8, 16),
    Field::hex("Mask", 8, 24),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("ERST", ERST_FIELDS),
    ("Serialization Instruction Entry", SERIALIZATION_INSTRUCTION_ENTRY),
];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(erst) = parse_fixed(report, "ERST", table.bytes, ERST_FIELDS) else {
        return;
    };
    let count = erst.u32("Instruction Entry Count").unwrap_or(0);
    let size = schema_len(SERIALIZATION_INSTRUCTION_ENTRY);
    let start = erst.consumed();
    let entries = usize::try_from(count).unwrap_or(usize::MAX);
    if !check_array_bounds(
        report,
        "Instruction Entry Count",
        start,
        entries,
        size,
        table.bytes.len(),
    ) {
        return;
    }
    if report.consistency_checks() && start + entries * size != table.bytes.len() {
        report_warning!(
            report,
            "{} bytes after the last Serialization Instruction Entry are not described.",
            table.bytes.len() - (start + entries * size)
        );
    }
    walker::parse_array(
        report,
        2,
        "Serialization Instruction Entry",
        table.bytes,
        start,
        u64::from(count),
        SERIALIZATION_INSTRUCTION_ENTRY,
    );
}
