//! # MPAM (Memory System Resource Partitioning and Monitoring Table)
//!
//! MSC nodes, each holding resource nodes, each holding functional
//! dependency descriptors. The Locator of a resource node is interpreted by
//! its Locator Type; interconnect locators point at a descriptor table
//! inside the MSC node.

use super::{NamedSchema, check_array_bounds, parse_bounded_array, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use alloc::format;

pub const MPAM_FIELDS: &[Field] = acpi_header_fields![];

pub const MSC_NODE_HEADER: &[Field] = &[
    Field::dec("Length", 2, 0),
    Field::hex("Interface Type", 1, 2),
];

const MSC_NODE: RecordHeader = RecordHeader {
    schema: MSC_NODE_HEADER,
    type_field: "Interface Type",
    length_field: "Length",
    what: "MSC Node",
};

pub const MSC_NODE_FIELDS: &[Field] = &[
    Field::dec("Length", 2, 0),
    Field::hex("Interface Type", 1, 2).check(Validator::OneOf(&[0x00, 0x0A])),
    Field::reserved(1, 3),
    Field::hex("Identifier", 4, 4),
    Field::hex("Base Address", 8, 8),
    Field::hex("MMIO Size", 4, 16),
    Field::hex("Overflow Interrupt", 4, 20),
    Field::hex("Overflow Interrupt Flags", 4, 24),
    Field::reserved(4, 28),
    Field::hex("Overflow Interrupt Affinity", 4, 32),
    Field::hex("Error Interrupt", 4, 36),
    Field::hex("Error Interrupt Flags", 4, 40),
    Field::reserved(4, 44),
    Field::hex("Error Interrupt Affinity", 4, 48),
    Field::dec("MAX_NRDY_USEC", 4, 52),
    Field::chars("Hardware ID of Linked Device", 8, 56),
    Field::hex("Instance ID of Linked Device", 4, 64),
    Field::dec("Number of Resource Nodes", 4, 68),
];

pub const RESOURCE_NODE: &[Field] = &[
    Field::hex("Identifier", 4, 0),
    Field::hex("RIS Index", 1, 4),
    Field::reserved(2, 5),
    Field::hex("Locator Type", 1, 7),
    Field::silent("Locator", 12, 8),
    Field::dec("Number of Functional Dependencies", 4, 20),
];

pub const FUNCTIONAL_DEPENDENCY: &[Field] = &[Field::hex("Producer", 4, 0), Field::reserved(4, 4)];

pub const PROCESSOR_CACHE_LOCATOR: &[Field] = &[
    Field::hex("Cache Reference", 8, 0),
    Field::reserved(4, 8),
];

pub const MEMORY_LOCATOR: &[Field] = &[Field::hex("Proximity Domain", 8, 0), Field::reserved(4, 8)];

pub const SMMU_LOCATOR: &[Field] = &[Field::hex("IORT Reference", 8, 0), Field::reserved(4, 8)];

pub const MEMORY_SIDE_CACHE_LOCATOR: &[Field] = &[
    Field::reserved(7, 0),
    Field::dec("Level", 1, 7),
    Field::reserved(4, 8),
];

pub const ACPI_DEVICE_LOCATOR: &[Field] = &[
    Field::chars("ACPI Hardware ID", 8, 0),
    Field::hex("ACPI Unique ID", 4, 8),
];

pub const INTERCONNECT_LOCATOR: &[Field] = &[
    Field::dec("Interconnect Descriptor Table Offset", 8, 0),
    Field::reserved(4, 8),
];

pub const UNKNOWN_LOCATOR: &[Field] = &[
    Field::hex("Descriptor1", 8, 0),
    Field::hex("Descriptor2", 4, 8),
];

pub const INTERCONNECT_DESCRIPTOR_TABLE: &[Field] = &[
    Field::bytes("Signature", 16, 0),
    Field::dec("Number of Interconnect Descriptors", 4, 16),
];

pub const INTERCONNECT_DESCRIPTOR: &[Field] = &[
    Field::hex("Source ID", 4, 0),
    Field::hex("Destination ID", 4, 4),
    Field::hex("Link Type", 1, 8).check(Validator::AtMost(1)),
    Field::reserved(3, 9),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("MPAM", MPAM_FIELDS),
    ("MSC Node Header", MSC_NODE_HEADER),
    ("MSC Node", MSC_NODE_FIELDS),
    ("Resource Node", RESOURCE_NODE),
    ("Functional Dependency Descriptor", FUNCTIONAL_DEPENDENCY),
    ("Processor Cache Locator", PROCESSOR_CACHE_LOCATOR),
    ("Memory Locator", MEMORY_LOCATOR),
    ("SMMU Locator", SMMU_LOCATOR),
    ("Memory-side Cache Locator", MEMORY_SIDE_CACHE_LOCATOR),
    ("ACPI Device Locator", ACPI_DEVICE_LOCATOR),
    ("Interconnect Locator", INTERCONNECT_LOCATOR),
    ("Unknown Locator", UNKNOWN_LOCATOR),
    ("Interconnect Descriptor Table", INTERCONNECT_DESCRIPTOR_TABLE),
    ("Interconnect Descriptor", INTERCONNECT_DESCRIPTOR),
];

/// Locator Type of an interconnect.
pub const LOCATOR_INTERCONNECT: u64 = 5;

const fn locator(kind: u64) -> Option<(&'static str, &'static [Field])> {
    Some(match kind {
        0 => ("Processor Cache Locator", PROCESSOR_CACHE_LOCATOR),
        1 => ("Memory Locator", MEMORY_LOCATOR),
        2 => ("SMMU Locator", SMMU_LOCATOR),
        3 => ("Memory-side Cache Locator", MEMORY_SIDE_CACHE_LOCATOR),
        4 => ("ACPI Device Locator", ACPI_DEVICE_LOCATOR),
        LOCATOR_INTERCONNECT => ("Interconnect Locator", INTERCONNECT_LOCATOR),
        0xFF => ("Unknown Locator", UNKNOWN_LOCATOR),
        _ => return None,
    })
}

/// Parse the interconnect descriptor table at MSC-relative `offset`.
///
/// The table must start at or after `lower`, the end of the resource node
/// that references it, and end inside the node.
fn interconnect_table(report: &mut Report<'_>, msc: &[u8], offset: u64, lower: usize) {
    let header = schema_len(INTERCONNECT_DESCRIPTOR_TABLE);
    let Some(start) = usize::try_from(offset)
        .ok()
        .filter(|&o| o >= lower && o.saturating_add(header) <= msc.len())
    else {
        report_error!(
            report,
            "Interconnect Descriptor Table Offset {offset} is out of bounds. \
             It must lie in [{lower}, {}].",
            msc.len().saturating_sub(header)
        );
        return;
    };
    let table = walker::parse(
        report,
        4,
        Some("Interconnect Descriptor Table"),
        &msc[start..start + header],
        INTERCONNECT_DESCRIPTOR_TABLE,
    );
    parse_bounded_array(
        report,
        "Interconnect Descriptor",
        msc,
        Some(start + header),
        table.value("Number of Interconnect Descriptors"),
        INTERCONNECT_DESCRIPTOR,
    );
}

/// Parse one resource node at `offset` within the MSC node and return its
/// size, or `None` if it does not fit.
fn resource_node(report: &mut Report<'_>, msc: &[u8], index: u32, offset: usize) -> Option<usize> {
    let fixed = schema_len(RESOURCE_NODE);
    let Some(bytes) = msc.get(offset..).filter(|b| b.len() >= fixed) else {
        report_error!(
            report,
            "Insufficient MSC node length for Resource Node [{index}]. Offset = {offset}. Length \
            = {}.",
            msc.len()
        );
        return None;
    };
    let title = format!("Resource Node [{index}]");
    let node = walker::parse(report, 2, Some(&title), &bytes[..fixed], RESOURCE_NODE);

    let count = node.u32("Number of Functional Dependencies").unwrap_or(0);
    let dependencies = usize::try_from(count).unwrap_or(usize::MAX);
    let size = schema_len(FUNCTIONAL_DEPENDENCY);
    let end = dependencies
        .saturating_mul(size)
        .saturating_add(fixed)
        .saturating_add(offset);

    let kind = node.value("Locator Type").unwrap_or(0);
    let raw = node.bytes("Locator").unwrap_or_default();
    match locator(kind) {
        Some((name, schema)) => {
            let fields = walker::parse(report, 4, Some(name), raw, schema);
            if kind == LOCATOR_INTERCONNECT
                && let Some(table) = fields.u64("Interconnect Descriptor Table Offset")
            {
                interconnect_table(report, msc, table, end);
            }
        }
        None => report_error!(report, "Locator Type 0x{kind:X} is reserved."),
    }

    if !check_array_bounds(
        report,
        "Functional Dependency Descriptors",
        fixed,
        dependencies,
        size,
        bytes.len(),
    ) {
        return None;
    }
    walker::parse_array(
        report,
        4,
        "Functional Dependency Descriptor",
        bytes,
        fixed,
        u64::from(count),
        FUNCTIONAL_DEPENDENCY,
    );
    Some(fixed + dependencies * size)
}

fn msc_node(report: &mut Report<'_>, index: usize, bytes: &[u8]) {
    let title = format!("MSC Node [{index}]");
    let msc = walker::parse(report, 2, Some(&title), bytes, MSC_NODE_FIELDS);
    if msc.visited() < MSC_NODE_FIELDS.len() {
        report_error!(report, "MSC Node [{index}] is truncated. Length = {}.", bytes.len());
        return;
    }

    let resources = msc.u32("Number of Resource Nodes").unwrap_or(0);
    let mut offset = msc.consumed();
    for r in 0..resources {
        let Some(size) = resource_node(report, bytes, r, offset) else {
            return;
        };
        offset += size;
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(mpam) = parse_fixed(report, "MPAM", table.bytes, MPAM_FIELDS) else {
        return;
    };

    let mut records = Records::new("MPAM", table.bytes, mpam.consumed(), MSC_NODE);
    let mut index = 0;
    while let Some(record) = records.next_record(report) {
        msc_node(report, index, record.bytes);
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    /// An MSC node with one interconnect resource node whose descriptor
    /// table, holding one descriptor, sits at `table_offset`.
    fn msc_with_interconnect(table_offset: u64) -> Vec<u8> {
        let mut b = vec![0u8; 72];
        b[68] = 1;
        let mut resource = vec![0u8; 24];
        resource[7] = 5;
        resource[8..16].copy_from_slice(&table_offset.to_le_bytes());
        b.extend_from_slice(&resource);
        let mut table = vec![0u8; 20];
        table[16] = 1;
        b.extend_from_slice(&table);
        b.extend_from_slice(&[0u8; 12]);
        let length = u16::try_from(b.len()).unwrap();
        b[0..2].copy_from_slice(&length.to_le_bytes());
        b
    }

    fn errors(bytes: &[u8]) -> u32 {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        msc_node(&mut r, 0, bytes);
        r.diagnostics().errors()
    }

    #[test]
    fn interconnect_table_inside_the_node_is_clean() {
        assert_eq!(errors(&msc_with_interconnect(96)), 0);
    }

    #[test]
    fn interconnect_table_bounds() {
        // Inside the fixed MSC fields.
        assert_eq!(errors(&msc_with_interconnect(8)), 1);
        // Past the end of the node.
        assert_eq!(errors(&msc_with_interconnect(1024)), 1);
    }

    #[test]
    fn interconnect_table_may_not_overlap_its_resource_node() {
        // The resource node occupies [72, 96).
        assert_eq!(errors(&msc_with_interconnect(72)), 1);
        assert_eq!(errors(&msc_with_interconnect(88)), 1);
    }

    #[test]
    fn every_defined_locator_has_a_layout() {
        for kind in [0u64, 1, 2, 3, 4, 5, 0xFF] {
            assert!(locator(kind).is_some());
        }
        assert!(locator(6).is_none());
    }
}
