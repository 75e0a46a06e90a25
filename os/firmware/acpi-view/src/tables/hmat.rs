//! # HMAT (Heterogeneous Memory Attribute Table)

use super::{NamedSchema, check_array_bounds, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::format::{le_u16, le_u32, le_value_any};
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use bitfield_struct::bitfield;

pub const HMAT_FIELDS: &[Field] = acpi_header_fields![Field::reserved(4, 36)];

pub const HMAT_STRUCTURE_HEADER: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::reserved(2, 2),
    Field::dec("Length", 4, 4),
];

const STRUCTURE: RecordHeader = RecordHeader {
    schema: HMAT_STRUCTURE_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "HMAT Structure",
};

/// System Locality Latency and Bandwidth Information flags.
#[bitfield(u8)]
pub struct LatencyFlags {
    #[bits(4)]
    pub memory_hierarchy: u8,
    #[bits(2)]
    pub access_attributes: u8,
    #[bits(2)]
    __: u8,
}

/// Memory Side Cache attributes.
#[bitfield(u32)]
pub struct CacheAttributes {
    #[bits(4)]
    pub total_cache_levels: u8,
    #[bits(4)]
    pub cache_level: u8,
    #[bits(4)]
    pub associativity: u8,
    #[bits(4)]
    pub write_policy: u8,
    pub cache_line_size: u16,
}

fn validate_latency_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = LatencyFlags::from_bits(u8::try_from(le_value_any(bytes)).unwrap_or(0));
    if flags.memory_hierarchy() > 3 {
        report_error!(report, "Memory Hierarchy of {} is reserved.", flags.memory_hierarchy());
    }
}

fn validate_cache_attributes(report: &mut Report<'_>, bytes: &[u8]) {
    let attributes = CacheAttributes::from_bits(u32::try_from(le_value_any(bytes)).unwrap_or(0));
    if attributes.total_cache_levels() > 3 {
        report_error!(
            report,
            "Total Cache Levels of {} exceeds 3.",
            attributes.total_cache_levels()
        );
    }
    if attributes.cache_level() > 3 {
        report_error!(report, "Cache Level of {} exceeds 3.", attributes.cache_level());
    }
    if attributes.associativity() > 2 {
        report_error!(report, "Cache Associativity of {} is reserved.", attributes.associativity());
    }
    if attributes.write_policy() > 2 {
        report_error!(report, "Write Policy of {} is reserved.", attributes.write_policy());
    }
}

pub const MEMORY_PROXIMITY_DOMAIN_ATTRIBUTES: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::reserved(2, 2),
    Field::dec("Length", 4, 4),
    Field::hex("Flags", 2, 8),
    Field::reserved(2, 10),
    Field::hex("Attached Initiator Proximity Domain", 4, 12),
    Field::hex("Memory Proximity Domain", 4, 16),
    Field::reserved(4, 20),
    Field::reserved(8, 24),
    Field::reserved(8, 32),
];

pub const LATENCY_BANDWIDTH_INFO: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::reserved(2, 2),
    Field::dec("Length", 4, 4),
    Field::hex("Flags", 1, 8).check_with(validate_latency_flags),
    Field::dec("Data Type", 1, 9).check(Validator::AtMost(5)),
    Field::dec("Min Transfer Size", 1, 10),
    Field::reserved(1, 11),
    Field::dec("Number of Initiator Proximity Domains", 4, 12),
    Field::dec("Number of Target Proximity Domains", 4, 16),
    Field::reserved(4, 20),
    Field::hex("Entry Base Unit", 8, 24),
];

pub const MEMORY_SIDE_CACHE_INFO: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::reserved(2, 2),
    Field::dec("Length", 4, 4),
    Field::hex("Memory Proximity Domain", 4, 8),
    Field::reserved(4, 12),
    Field::hex("Memory Side Cache Size", 8, 16),
    Field::hex("Cache Attributes", 4, 24).check_with(validate_cache_attributes),
    Field::reserved(2, 28),
    Field::dec("Number of SMBIOS Handles", 2, 30),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("HMAT", HMAT_FIELDS),
    ("HMAT Structure Header", HMAT_STRUCTURE_HEADER),
    ("Memory Proximity Domain Attributes", MEMORY_PROXIMITY_DOMAIN_ATTRIBUTES),
    ("System Locality Latency and Bandwidth Information", LATENCY_BANDWIDTH_INFO),
    ("Memory Side Cache Information", MEMORY_SIDE_CACHE_INFO),
];

const DATA_TYPES: [&str; 6] = [
    "Access Latency",
    "Read Latency",
    "Write Latency",
    "Access Bandwidth",
    "Read Bandwidth",
    "Write Bandwidth",
];

/// Print the proximity domain lists and the Initiator × Target matrix.
fn latency_bandwidth(report: &mut Report<'_>, bytes: &[u8]) {
    let info = walker::parse(
        report,
        2,
        Some("System Locality Latency and Bandwidth Information"),
        bytes,
        LATENCY_BANDWIDTH_INFO,
    );
    let (Some(initiators), Some(targets)) = (
        info.usize("Number of Initiator Proximity Domains"),
        info.usize("Number of Target Proximity Domains"),
    ) else {
        report_error!(report, "Insufficient length to read the latency and bandwidth header.");
        return;
    };

    let start = schema_len(LATENCY_BANDWIDTH_INFO);
    let targets_start = start + initiators.saturating_mul(4);
    let entries_start = targets_start.saturating_add(targets.saturating_mul(4));
    let lists = [
        ("Initiator Proximity Domain List", start, initiators, 4),
        ("Target Proximity Domain List", targets_start, targets, 4),
        ("Latency/Bandwidth Entries", entries_start, initiators.saturating_mul(targets), 2),
    ];
    for (what, offset, count, size) in lists {
        if !check_array_bounds(report, what, offset, count, size, bytes.len()) {
            return;
        }
    }

    for i in 0..initiators {
        report.field_name(4, &alloc::format!("Initiator Proximity Domain [{i}]"));
        report!(report, "0x{:X}\n", le_u32(bytes, start + i * 4).unwrap_or(0));
    }
    for t in 0..targets {
        report.field_name(4, &alloc::format!("Target Proximity Domain [{t}]"));
        report!(report, "0x{:X}\n", le_u32(bytes, targets_start + t * 4).unwrap_or(0));
    }

    let data_type = info.u8("Data Type").map_or(0, usize::from);
    let label = DATA_TYPES.get(data_type).copied().unwrap_or("Reserved");
    report!(report, "    {label} Matrix (Entry Base Unit multiples)\n      Target ->");
    for t in 0..targets {
        report!(report, " {t:>6}");
    }
    report!(report, "\n");
    for i in 0..initiators {
        report!(report, "      I[{i:>4}]  ");
        for t in 0..targets {
            let entry = le_u16(bytes, entries_start + (i * targets + t) * 2).unwrap_or(0);
            report!(report, " {entry:>6}");
        }
        report!(report, "\n");
    }
}

fn memory_side_cache(report: &mut Report<'_>, bytes: &[u8]) {
    let info = walker::parse(
        report,
        2,
        Some("Memory Side Cache Information"),
        bytes,
        MEMORY_SIDE_CACHE_INFO,
    );
    let Some(handles) = info.usize("Number of SMBIOS Handles") else {
        report_error!(report, "Insufficient length to read the memory side cache header.");
        return;
    };
    let start = schema_len(MEMORY_SIDE_CACHE_INFO);
    if !check_array_bounds(report, "SMBIOS Handle List", start, handles, 2, bytes.len()) {
        return;
    }
    for h in 0..handles {
        report.field_name(4, &alloc::format!("SMBIOS Handle [{h}]"));
        report!(report, "0x{:04X}\n", le_u16(bytes, start + h * 2).unwrap_or(0));
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(hmat) = parse_fixed(report, "HMAT", table.bytes, HMAT_FIELDS) else {
        return;
    };

    let mut records = Records::new("HMAT", table.bytes, hmat.consumed(), STRUCTURE);
    while let Some(record) = records.next_record(report) {
        match record.kind {
            0 => {
                walker::parse(
                    report,
                    2,
                    Some("Memory Proximity Domain Attributes"),
                    record.bytes,
                    MEMORY_PROXIMITY_DOMAIN_ATTRIBUTES,
                );
            }
            1 => latency_bandwidth(report, record.bytes),
            2 => memory_side_cache(report, record.bytes),
            kind => report_error!(
                report,
                "Unknown HMAT structure, Type = {kind}, Offset = {}.",
                record.offset
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    fn latency_structure(initiators: u8, targets: u8, short_by: usize) -> Vec<u8> {
        let (i, t) = (usize::from(initiators), usize::from(targets));
        let length = 32 + 4 * (i + t) + 2 * i * t - short_by;
        let mut b = vec![0u8; length];
        b[0] = 1;
        b[4] = u8::try_from(length).unwrap();
        b[12] = initiators;
        b[16] = targets;
        b
    }

    fn errors(bytes: &[u8]) -> u32 {
        let mut out = String::new();
        let mut r = Report::new(&mut out).with_consistency_checks(true);
        latency_bandwidth(&mut r, bytes);
        r.diagnostics().errors()
    }

    #[test]
    fn complete_matrix_is_clean() {
        assert_eq!(errors(&latency_structure(2, 3, 0)), 0);
    }

    #[test]
    fn truncated_matrix_is_reported() {
        assert_eq!(errors(&latency_structure(2, 3, 2)), 1);
    }

    #[test]
    fn cache_attribute_fields() {
        let a = CacheAttributes::from_bits(0x0040_1211);
        assert_eq!(a.total_cache_levels(), 1);
        assert_eq!(a.cache_level(), 1);
        assert_eq!(a.associativity(), 2);
        assert_eq!(a.write_policy(), 1);
        assert_eq!(a.cache_line_size(), 0x40);
    }
}
