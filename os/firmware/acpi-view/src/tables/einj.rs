//! # EINJ (Error Injection Table)

use super::{NamedSchema, check_array_bounds, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::format::le_value_any;
use crate::report::Report;
use crate::walker;
use crate::{Session, Table};

/// Size of the fields following the common header.
pub const INJECTION_HEADER_SIZE: u64 = 12;

/// Action 0xFF triggers the injected error.
fn validate_action(report: &mut Report<'_>, bytes: &[u8]) {
    let action = le_value_any(bytes);
    if action > 9 && action != 0xFF {
        report_error!(report, "Injection Action 0x{action:X} is reserved.");
    }
}

pub const EINJ_FIELDS: &[Field] = acpi_header_fields![
    Field::dec("Injection Header Size", 4, 36).check(Validator::OneOf(&[INJECTION_HEADER_SIZE])),
    Field::hex("Injection Flags", 1, 40).check(Validator::Zero),
    Field::reserved(3, 41),
    Field::dec("Injection Entry Count", 4, 44),
];

pub const INJECTION_INSTRUCTION_ENTRY: &[Field] = &[
    Field::hex("Injection Action", 1, 0).check_with(validate_action),
    Field::hex("Instruction", 1, 1).check(Validator::AtMost(4)),
    Field::hex("Flags", 1, 2).check(Validator::AtMost(1)),
    Field::reserved(1, 3),
    Field::gas("Register Region", 4),
    Field::hex("Value", 8, 16),
    Field::hex("Mask", 8, 24),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("EINJ", EINJ_FIELDS),
    ("Injection Instruction Entry", INJECTION_INSTRUCTION_ENTRY),
];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(einj) = parse_fixed(report, "EINJ", table.bytes, EINJ_FIELDS) else {
        return;
    };
    let count = einj.u32("Injection Entry Count").unwrap_or(0);
    let entries = usize::try_from(count).unwrap_or(usize::MAX);
    let size = schema_len(INJECTION_INSTRUCTION_ENTRY);
    if !check_array_bounds(
        report,
        "Injection Entry Count",
        einj.consumed(),
        entries,
        size,
        table.bytes.len(),
    ) {
        return;
    }
    walker::parse_array(
        report,
        2,
        "Injection Instruction Entry",
        table.bytes,
        einj.consumed(),
        u64::from(count),
        INJECTION_INSTRUCTION_ENTRY,
    );
}
