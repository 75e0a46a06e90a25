//! # SRAT (System Resource Affinity Table)
//!
//! Associates processors, memory ranges, ITSs and generic initiators/ports
//! with proximity domains. Each kind of structure is numbered separately in
//! the trace.

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use alloc::format;

pub const SRAT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Reserved", 4, 36).check(Validator::OneOf(&[1])),
    Field::reserved(8, 40),
];

pub const AFFINITY_HEADER: &[Field] = &[Field::hex("Type", 1, 0), Field::dec("Length", 1, 1)];

const AFFINITY: RecordHeader = RecordHeader {
    schema: AFFINITY_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "Static Resource Allocation Structure",
};

pub const APIC_SAPIC_AFFINITY: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Proximity Domain [7:0]", 1, 2),
    Field::hex("APIC ID", 1, 3),
    Field::hex("Flags", 4, 4),
    Field::hex("Local SAPIC EID", 1, 8),
    Field::bytes("Proximity Domain [31:8]", 3, 9),
    Field::hex("Clock Domain", 4, 12),
];

pub const MEMORY_AFFINITY: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Proximity Domain", 4, 2),
    Field::reserved(2, 6),
    Field::hex("Base Address Low", 4, 8),
    Field::hex("Base Address High", 4, 12),
    Field::hex("Length Low", 4, 16),
    Field::hex("Length High", 4, 20),
    Field::reserved(4, 24),
    Field::hex("Flags", 4, 28),
    Field::reserved(8, 32),
];

pub const X2APIC_AFFINITY: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("Proximity Domain", 4, 4),
    Field::hex("X2APIC ID", 4, 8),
    Field::hex("Flags", 4, 12),
    Field::hex("Clock Domain", 4, 16),
    Field::reserved(4, 20),
];

pub const GICC_AFFINITY: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Proximity Domain", 4, 2),
    Field::hex("ACPI Processor UID", 4, 6),
    Field::hex("Flags", 4, 10),
    Field::hex("Clock Domain", 4, 14),
];

pub const GIC_ITS_AFFINITY: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Proximity Domain", 4, 2),
    Field::reserved(2, 6),
    Field::hex("ITS Id", 4, 8),
];

/// Generic Initiator and Generic Port affinity share this layout.
pub const GENERIC_AFFINITY: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(1, 2),
    Field::hex("Device Handle Type", 1, 3).check(Validator::AtMost(1)),
    Field::hex("Proximity Domain", 4, 4),
    Field::bytes("Device Handle", 16, 8),
    Field::hex("Flags", 4, 24),
    Field::reserved(4, 28),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("SRAT", SRAT_FIELDS),
    ("SRAT Structure Header", AFFINITY_HEADER),
    ("Processor Local APIC/SAPIC Affinity", APIC_SAPIC_AFFINITY),
    ("Memory Affinity", MEMORY_AFFINITY),
    ("Processor Local x2APIC Affinity", X2APIC_AFFINITY),
    ("GICC Affinity", GICC_AFFINITY),
    ("GIC ITS Affinity", GIC_ITS_AFFINITY),
    ("Generic Initiator/Port Affinity", GENERIC_AFFINITY),
];

const KINDS: usize = 7;

/// Display name and schema of a structure type.
const fn kind(kind: u64) -> Option<(&'static str, &'static [Field])> {
    Some(match kind {
        0 => ("Processor Local APIC/SAPIC Affinity Structure", APIC_SAPIC_AFFINITY),
        1 => ("Memory Affinity Structure", MEMORY_AFFINITY),
        2 => ("Processor Local x2APIC Affinity Structure", X2APIC_AFFINITY),
        3 => ("GICC Affinity Structure", GICC_AFFINITY),
        4 => ("GIC ITS Affinity Structure", GIC_ITS_AFFINITY),
        5 => ("Generic Initiator Affinity Structure", GENERIC_AFFINITY),
        6 => ("Generic Port Affinity Structure", GENERIC_AFFINITY),
        _ => return None,
    })
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(srat) = parse_fixed(report, "SRAT", table.bytes, SRAT_FIELDS) else {
        return;
    };

    let mut seen = [0usize; KINDS];
    let mut records = Records::new("SRAT", table.bytes, srat.consumed(), AFFINITY);
    while let Some(record) = records.next_record(report) {
        let (Some((name, schema)), Some(index)) = (
            kind(record.kind),
            usize::try_from(record.kind).ok().and_then(|k| seen.get_mut(k)),
        ) else {
            report_error!(report, "Unknown SRAT Affinity type = 0x{:X}.", record.kind);
            continue;
        };
        let title = format!("{name} [{index}]");
        *index += 1;
        walker::parse(report, 2, Some(&title), record.bytes, schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::schema_len;
    use crate::tables::testing::{table, trace};
    use alloc::vec::Vec;

    fn structure(kind: u8, schema: &[Field]) -> Vec<u8> {
        let length = schema_len(schema);
        let mut s = vec![0u8; length];
        s[0] = kind;
        s[1] = u8::try_from(length).unwrap();
        s
    }

    #[test]
    fn titles_carry_a_running_index_per_kind() {
        let mut body = vec![0u8; 12];
        body[0] = 1;
        for s in [
            structure(3, GICC_AFFINITY),
            structure(1, MEMORY_AFFINITY),
            structure(3, GICC_AFFINITY),
            structure(1, MEMORY_AFFINITY),
        ] {
            body.extend_from_slice(&s);
        }
        let (diagnostics, out) = trace(&table(b"SRAT", 3, &body));
        assert!(diagnostics.is_clean(), "{out}");
        assert!(out.contains("GICC Affinity Structure [0]"));
        assert!(out.contains("GICC Affinity Structure [1]"));
        assert!(out.contains("Memory Affinity Structure [0]"));
        assert!(out.contains("Memory Affinity Structure [1]"));
        assert!(!out.contains("Memory Affinity Structure [2]"));
    }

    #[test]
    fn unknown_affinity_type_is_an_error() {
        let mut body = vec![0u8; 12];
        body[0] = 1;
        body.extend_from_slice(&[7, 8, 0, 0, 0, 0, 0, 0]);
        let (diagnostics, out) = trace(&table(b"SRAT", 3, &body));
        assert_eq!(diagnostics.errors(), 1);
        assert!(out.contains("Unknown SRAT Affinity type = 0x7"));
    }
}
