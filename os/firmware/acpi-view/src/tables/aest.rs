//! # AEST (Arm Error Source Table)
//!
//! Error nodes whose node-specific data, interface and interrupt array are
//! located by offsets relative to the start of the node.

use super::{NamedSchema, parse_bounded_array, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};

pub const AEST_FIELDS: &[Field] = acpi_header_fields![];

pub const NODE_HEADER: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 2, 1),
    Field::reserved(1, 3),
    Field::dec("Node Data Offset", 4, 4),
    Field::dec("Node Interface Offset", 4, 8),
    Field::dec("Node Interrupt Array Offset", 4, 12),
    Field::dec("Node Interrupt Count", 4, 16),
    Field::dec("Timestamp Rate", 8, 20),
    Field::reserved(8, 28),
    Field::dec("Error Injection Countdown Rate", 8, 36),
];

const NODE: RecordHeader = RecordHeader {
    schema: NODE_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "AEST Node",
};

pub const PROCESSOR_NODE: &[Field] = &[
    Field::hex("ACPI Processor ID", 4, 0),
    Field::dec("Resource Type", 1, 4).check(Validator::AtMost(2)),
    Field::reserved(1, 5),
    Field::hex("Flags", 1, 6),
    Field::dec("Revision", 1, 7),
    Field::hex("Processor Affinity Level Indicator", 8, 8),
];

pub const CACHE_RESOURCE: &[Field] = &[Field::hex("Cache Reference", 4, 0), Field::reserved(4, 4)];

pub const TLB_RESOURCE: &[Field] = &[Field::dec("TLB Level", 4, 0), Field::reserved(4, 4)];

pub const GENERIC_RESOURCE: &[Field] = &[Field::hex("Data", 4, 0)];

pub const MEMORY_NODE: &[Field] = &[Field::hex("SRAT Proximity Domain", 4, 0)];

pub const SMMU_NODE: &[Field] = &[
    Field::hex("IORT Node Reference", 4, 0),
    Field::hex("SubComponent Reference", 4, 4),
];

pub const VENDOR_NODE: &[Field] = &[
    Field::hex("Hardware ID", 4, 0),
    Field::hex("Unique ID", 4, 4),
    Field::bytes("Vendor Specific Data", 16, 8),
];

pub const GIC_NODE: &[Field] = &[
    Field::dec("Interface Type", 4, 0).check(Validator::AtMost(3)),
    Field::hex("Instance Identifier", 4, 4),
];

pub const NODE_INTERFACE: &[Field] = &[
    Field::dec("Interface Type", 1, 0).check(Validator::AtMost(1)),
    Field::reserved(3, 1),
    Field::hex("Flags", 4, 4),
    Field::hex("Base Address", 8, 8),
    Field::dec("Start Error Record Index", 4, 16),
    Field::dec("Number of Error Records", 4, 20),
    Field::hex("Error Records Implemented", 8, 24),
    Field::hex("Error Records Status Reporting Supported", 8, 32),
    Field::hex("Addressing Mode", 8, 40),
];

pub const NODE_INTERRUPT: &[Field] = &[
    Field::dec("Interrupt Type", 1, 0).check(Validator::AtMost(1)),
    Field::reserved(2, 1),
    Field::hex("Interrupt Flags", 1, 3),
    Field::hex("Interrupt GSIV", 4, 4),
    Field::hex("ID", 1, 8),
    Field::reserved(3, 9),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("AEST", AEST_FIELDS),
    ("AEST Node Header", NODE_HEADER),
    ("Processor Error Node", PROCESSOR_NODE),
    ("Cache Resource", CACHE_RESOURCE),
    ("TLB Resource", TLB_RESOURCE),
    ("Generic Resource", GENERIC_RESOURCE),
    ("Memory Error Node", MEMORY_NODE),
    ("SMMU Error Node", SMMU_NODE),
    ("Vendor Error Node", VENDOR_NODE),
    ("GIC Error Node", GIC_NODE),
    ("Node Interface", NODE_INTERFACE),
    ("Node Interrupt", NODE_INTERRUPT),
];

/// Node types.
pub mod node {
    pub const PROCESSOR: u64 = 0;
    pub const MEMORY: u64 = 1;
    pub const SMMU: u64 = 2;
    pub const VENDOR: u64 = 3;
    pub const GIC: u64 = 4;
}

const fn node_data(kind: u64) -> Option<(&'static str, &'static [Field])> {
    Some(match kind {
        node::PROCESSOR => ("Processor Error Node", PROCESSOR_NODE),
        node::MEMORY => ("Memory Error Node", MEMORY_NODE),
        node::SMMU => ("SMMU Error Node", SMMU_NODE),
        node::VENDOR => ("Vendor Error Node", VENDOR_NODE),
        node::GIC => ("GIC Error Node", GIC_NODE),
        _ => return None,
    })
}

const fn processor_resource(kind: u64) -> Option<(&'static str, &'static [Field])> {
    Some(match kind {
        0 => ("Cache Resource", CACHE_RESOURCE),
        1 => ("TLB Resource", TLB_RESOURCE),
        2 => ("Generic Resource", GENERIC_RESOURCE),
        _ => return None,
    })
}

/// `bytes[offset..offset + len]`, or an error if it leaves the node.
fn substructure<'a>(
    report: &mut Report<'_>,
    what: &str,
    bytes: &'a [u8],
    offset: usize,
    len: usize,
) -> Option<&'a [u8]> {
    let found = offset.checked_add(len).and_then(|end| bytes.get(offset..end));
    if found.is_none() {
        report_error!(
            report,
            "{what} of {len} bytes at node offset {offset} exceeds the node length {}.",
            bytes.len()
        );
    }
    found
}

fn error_node(report: &mut Report<'_>, kind: u64, bytes: &[u8]) {
    let Some((name, schema)) = node_data(kind) else {
        report_error!(report, "Unknown AEST node type {kind}.");
        return;
    };
    let header = walker::parse(report, 2, Some(name), bytes, NODE_HEADER);
    if header.visited() < NODE_HEADER.len() {
        report_error!(report, "{name}: node of {} bytes is shorter than its header.", bytes.len());
        return;
    }

    let data_offset = header.usize("Node Data Offset").unwrap_or(0);
    if let Some(data) = substructure(report, "Node data", bytes, data_offset, schema_len(schema)) {
        let fields = walker::parse(report, 4, None, data, schema);
        if kind == node::PROCESSOR {
            let resource = fields.value("Resource Type").unwrap_or(0);
            let after = data_offset + schema_len(schema);
            if let Some((label, resource_schema)) = processor_resource(resource)
                && let Some(raw) = substructure(
                    report,
                    label,
                    bytes,
                    after,
                    schema_len(resource_schema),
                )
            {
                walker::parse(report, 4, Some(label), raw, resource_schema);
            }
        }
    }

    let interface_offset = header.usize("Node Interface Offset").unwrap_or(0);
    if let Some(raw) = substructure(
        report,
        "Node interface",
        bytes,
        interface_offset,
        schema_len(NODE_INTERFACE),
    ) {
        walker::parse(report, 4, Some("Node Interface"), raw, NODE_INTERFACE);
    }

    parse_bounded_array(
        report,
        "Node Interrupt",
        bytes,
        header.usize("Node Interrupt Array Offset"),
        header.value("Node Interrupt Count"),
        NODE_INTERRUPT,
    );
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(aest) = parse_fixed(report, "AEST", table.bytes, AEST_FIELDS) else {
        return;
    };

    let mut records = Records::new("AEST", table.bytes, aest.consumed(), NODE);
    let mut index = 0usize;
    while let Some(record) = records.next_record(report) {
        report!(report, "\n  AEST Node [{index}] at offset {}\n", record.offset);
        error_node(report, record.kind, record.bytes);
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    /// A memory error node with an interface and `interrupts` interrupts,
    /// whose interrupt array is declared at `interrupt_offset`.
    fn memory_node(interrupts: u8, interrupt_offset: u8) -> Vec<u8> {
        let mut b = vec![0u8; 44 + 4 + 48 + 12];
        b[0] = 1;
        let length = u16::try_from(b.len()).unwrap();
        b[1..3].copy_from_slice(&length.to_le_bytes());
        b[4] = 44;
        b[8] = 48;
        b[12] = interrupt_offset;
        b[16] = interrupts;
        b
    }

    fn errors(bytes: &[u8]) -> u32 {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        error_node(&mut r, 1, bytes);
        r.diagnostics().errors()
    }

    #[test]
    fn node_with_all_parts_inside_is_clean() {
        assert_eq!(errors(&memory_node(1, 96)), 0);
    }

    #[test]
    fn interrupt_array_past_the_node_is_reported() {
        assert_eq!(errors(&memory_node(2, 96)), 1);
    }
}
