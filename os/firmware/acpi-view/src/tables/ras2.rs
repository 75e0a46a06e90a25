//! # RAS2 (ACPI RAS2 Feature Table)

use super::{NamedSchema, check_array_bounds, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::walker;
use crate::{Session, Table};

pub const RAS2_FIELDS: &[Field] = acpi_header_fields![
    Field::reserved(2, 36),
    Field::dec("Number of PCC Descriptors", 2, 38),
];

pub const PCC_DESCRIPTOR: &[Field] = &[
    Field::hex("PCC Identifier", 1, 0),
    Field::reserved(2, 1),
    Field::hex("Feature Type", 1, 3).check(Validator::Zero),
    Field::hex("Instance", 4, 4),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("RAS2", RAS2_FIELDS),
    ("RAS2 PCC Descriptor", PCC_DESCRIPTOR),
];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(ras2) = parse_fixed(report, "RAS2", table.bytes, RAS2_FIELDS) else {
        return;
    };
    let count = ras2.u16("Number of PCC Descriptors").unwrap_or(0);
    let size = schema_len(PCC_DESCRIPTOR);
    if check_array_bounds(
        report,
        "Number of PCC Descriptors",
        ras2.consumed(),
        usize::from(count),
        size,
        table.bytes.len(),
    ) {
        walker::parse_array(
            report,
            2,
            "PCC Descriptor",
            table.bytes,
            ras2.consumed(),
            u64::from(count),
            PCC_DESCRIPTOR,
        );
    }
}
