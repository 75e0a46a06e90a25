//! # RIMT (RISC-V IO Mapping Table)
//!
//! IOMMU, PCIe root complex and platform device nodes. ID mappings name
//! their IOMMU by its offset in the table.

use super::{NamedSchema, parse_bounded_array, parse_fixed};
use crate::field::{Field, schema_len};
use crate::format::{le_u32, render_ascii_z};
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};

pub const RIMT_FIELDS: &[Field] = acpi_header_fields![
    Field::dec("Number of RIMT Nodes", 4, 36),
    Field::dec("Offset to RIMT Node Array", 4, 40),
    Field::reserved(4, 44),
];

pub const NODE_HEADER: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Revision", 1, 1),
    Field::dec("Length", 2, 2),
    Field::reserved(2, 4),
    Field::hex("ID", 2, 6),
];

const NODE: RecordHeader = RecordHeader {
    schema: NODE_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "RIMT Node",
};

pub const IOMMU_NODE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Revision", 1, 1),
    Field::dec("Length", 2, 2),
    Field::reserved(2, 4),
    Field::hex("ID", 2, 6),
    Field::chars("Hardware ID", 8, 8),
    Field::hex("Base Address", 8, 16),
    Field::hex("Flags", 4, 24),
    Field::hex("Proximity Domain", 4, 28),
    Field::hex("PCIe Segment Number", 2, 32),
    Field::hex("PCIe B/D/F", 2, 34),
    Field::dec("Number of Interrupt Wires", 2, 36),
    Field::dec("Interrupt Wire Array Offset", 2, 38),
];

pub const INTERRUPT_WIRE: &[Field] = &[
    Field::hex("Interrupt Number", 4, 0),
    Field::hex("Flags", 4, 4),
];

pub const PCIE_ROOT_COMPLEX_NODE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Revision", 1, 1),
    Field::dec("Length", 2, 2),
    Field::reserved(2, 4),
    Field::hex("ID", 2, 6),
    Field::hex("Flags", 4, 8),
    Field::reserved(2, 12),
    Field::hex("PCIe Segment Number", 2, 14),
    Field::dec("ID Mapping Array Offset", 2, 16),
    Field::dec("Number of ID Mappings", 2, 18),
];

pub const PLATFORM_DEVICE_NODE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Revision", 1, 1),
    Field::dec("Length", 2, 2),
    Field::reserved(2, 4),
    Field::hex("ID", 2, 6),
    Field::dec("ID Mapping Array Offset", 2, 8),
    Field::dec("Number of ID Mappings", 2, 10),
];

pub const ID_MAPPING: &[Field] = &[
    Field::hex("Source ID Base", 4, 0),
    Field::dec("Number of IDs", 4, 4),
    Field::hex("Destination Device ID Base", 4, 8),
    Field::hex("Destination IOMMU Offset", 4, 12),
    Field::hex("Flags", 4, 16),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("RIMT", RIMT_FIELDS),
    ("RIMT Node Header", NODE_HEADER),
    ("IOMMU Node", IOMMU_NODE),
    ("Interrupt Wire", INTERRUPT_WIRE),
    ("PCIe Root Complex Node", PCIE_ROOT_COMPLEX_NODE),
    ("Platform Device Node", PLATFORM_DEVICE_NODE),
    ("ID Mapping", ID_MAPPING),
];

/// Node types.
pub mod node {
    pub const IOMMU: u64 = 0;
    pub const PCIE_ROOT_COMPLEX: u64 = 1;
    pub const PLATFORM_DEVICE: u64 = 2;
}

/// Trace the ID mappings of a node and check that each names an IOMMU node.
fn id_mappings(
    report: &mut Report<'_>,
    table: &[u8],
    bytes: &[u8],
    offset: Option<usize>,
    count: Option<u64>,
) {
    parse_bounded_array(report, "ID Mapping", bytes, offset, count, ID_MAPPING);
    let (Some(offset), Some(count)) = (offset, count) else {
        return;
    };
    let size = schema_len(ID_MAPPING);
    for i in 0..usize::try_from(count).unwrap_or(0) {
        let Some(target) = le_u32(bytes, offset + i * size + 12) else {
            break;
        };
        let kind = usize::try_from(target).ok().and_then(|t| table.get(t)).copied();
        if kind.map(u64::from) != Some(node::IOMMU) {
            report_error!(
                report,
                "ID Mapping [{i}]: Destination IOMMU Offset 0x{target:X} does not point at an \
                IOMMU node."
            );
        }
    }
}

fn rimt_node(report: &mut Report<'_>, table: &[u8], kind: u64, bytes: &[u8]) {
    match kind {
        node::IOMMU => {
            let iommu = walker::parse(report, 2, Some("IOMMU Node"), bytes, IOMMU_NODE);
            parse_bounded_array(
                report,
                "Interrupt Wire",
                bytes,
                iommu.usize("Interrupt Wire Array Offset"),
                iommu.value("Number of Interrupt Wires"),
                INTERRUPT_WIRE,
            );
        }
        node::PCIE_ROOT_COMPLEX => {
            let rc = walker::parse(
                report,
                2,
                Some("PCIe Root Complex Node"),
                bytes,
                PCIE_ROOT_COMPLEX_NODE,
            );
            id_mappings(
                report,
                table,
                bytes,
                rc.usize("ID Mapping Array Offset"),
                rc.value("Number of ID Mappings"),
            );
        }
        node::PLATFORM_DEVICE => {
            let device =
                walker::parse(report, 2, Some("Platform Device Node"), bytes, PLATFORM_DEVICE_NODE);
            let start = schema_len(PLATFORM_DEVICE_NODE);
            let mappings = device.usize("ID Mapping Array Offset").unwrap_or(bytes.len());
            let end = if mappings > start { mappings.min(bytes.len()) } else { bytes.len() };
            match bytes.get(start..end).filter(|name| !name.is_empty()) {
                Some(name) => {
                    report.field_name(4, "Name");
                    render_ascii_z(report, name);
                    report!(report, "\n");
                }
                None => report_error!(report, "Platform Device Node: Name is missing."),
            }
            id_mappings(
                report,
                table,
                bytes,
                device.usize("ID Mapping Array Offset"),
                device.value("Number of ID Mappings"),
            );
        }
        _ => report_error!(report, "Unknown RIMT node type {kind}."),
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(rimt) = parse_fixed(report, "RIMT", table.bytes, RIMT_FIELDS) else {
        return;
    };
    let (Some(count), Some(offset)) = (
        rimt.u32("Number of RIMT Nodes"),
        rimt.usize("Offset to RIMT Node Array"),
    ) else {
        return;
    };
    if offset < rimt.consumed() || offset > table.bytes.len() {
        report_error!(
            report,
            "Invalid Offset to RIMT Node Array {offset}. Table length = {}.",
            table.bytes.len()
        );
        return;
    }

    let mut records = Records::new("RIMT", table.bytes, offset, NODE).limit(u64::from(count));
    let mut index = 0u32;
    while let Some(record) = records.next_record(report) {
        report!(report, "\n  RIMT Node [{index}] at offset {}\n", record.offset);
        rimt_node(report, table.bytes, record.kind, record.bytes);
        index += 1;
    }
    if index < count {
        report_error!(report, "Found {index} of {count} RIMT nodes.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    /// A table prefix with an IOMMU node at offset 8 and a root complex node
    /// with one mapping to `target`.
    fn table_with_mapping(target: u32) -> (Vec<u8>, core::ops::Range<usize>) {
        let mut t = vec![0u8; 8];
        let mut iommu = vec![0u8; 40];
        iommu[2] = 40;
        t.extend_from_slice(&iommu);
        let start = t.len();
        let mut rc = vec![0u8; 20 + 20];
        rc[0] = 1;
        rc[2] = 40;
        rc[16] = 20;
        rc[18] = 1;
        rc[32..36].copy_from_slice(&target.to_le_bytes());
        t.extend_from_slice(&rc);
        t[0] = 0xAA;
        (t, start..start + 40)
    }

    fn errors(target: u32) -> u32 {
        let (table, node) = table_with_mapping(target);
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        rimt_node(&mut r, &table, node::PCIE_ROOT_COMPLEX, &table[node]);
        r.diagnostics().errors()
    }

    #[test]
    fn mapping_to_an_iommu_is_clean() {
        assert_eq!(errors(8), 0);
    }

    #[test]
    fn mapping_elsewhere_is_reported() {
        assert_eq!(errors(0), 1);
        assert_eq!(errors(0x1000), 1);
    }
}
