//! MCFG (PCI Express memory mapped configuration space base address table).

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, schema_len};
use crate::{Session, Table, walker};
use alloc::format;

pub const MCFG_FIELDS: &[Field] = acpi_header_fields![Field::reserved(8, 36)];

pub const CONFIG_SPACE_ALLOCATION: &[Field] = &[
    Field::hex("Base Address", 8, 0),
    Field::hex("PCI Segment Group No.", 2, 8),
    Field::hex("Start Bus No.", 1, 10),
    Field::hex("End Bus No.", 1, 11),
    Field::reserved(4, 12),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("MCFG", MCFG_FIELDS),
    ("Configuration Space Base Address Allocation", CONFIG_SPACE_ALLOCATION),
];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(mcfg) = parse_fixed(report, "MCFG", table.bytes, MCFG_FIELDS) else {
        return;
    };
    let area = table.bytes.len() - mcfg.consumed();
    let size = schema_len(CONFIG_SPACE_ALLOCATION);
    if area % size != 0 {
        report_error!(
            report,
            "MCFG: {area} bytes of allocation structures is not a multiple of {size}."
        );
    }
    let entries = table.bytes[mcfg.consumed()..].chunks_exact(size);
    for (i, entry) in entries.enumerate() {
        let title = format!("PCI Configuration Space [{i}]");
        let allocation = walker::parse(report, 2, Some(&title), entry, CONFIG_SPACE_ALLOCATION);
        let bus = (allocation.u8("Start Bus No."), allocation.u8("End Bus No."));
        if let (Some(start), Some(end)) = bus
            && end < start
        {
            report_error!(report, "End Bus No. {end} is below Start Bus No. {start}.");
        }
    }
}
