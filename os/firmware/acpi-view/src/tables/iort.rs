//! # IORT (I/O Remapping Table)
//!
//! Nodes describe the I/O topology: ITS groups, named components, PCI root
//! complexes, SMMUs, PMCGs and reserved memory ranges. Every node shares a
//! 16-byte header that also locates its trailing array of ID mappings.

use super::{NamedSchema, parse_bounded_array, parse_fixed};
use crate::field::Field;
use crate::format::render_ascii_z;
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};

macro_rules! iort_node_fields {
    ($($field:expr),* $(,)?) => {
        &[
            $crate::field::Field::hex("Type", 1, 0),
            $crate::field::Field::dec("Length", 2, 1),
            $crate::field::Field::dec("Revision", 1, 3),
            $crate::field::Field::hex("Identifier", 4, 4),
            $crate::field::Field::dec("Number of ID mappings", 4, 8),
            $crate::field::Field::dec("Reference to ID Array", 4, 12),
            $($field),*
        ]
    };
}

pub const IORT_FIELDS: &[Field] = acpi_header_fields![
    Field::dec("Number of IORT Nodes", 4, 36),
    Field::dec("Offset to Array of IORT Nodes", 4, 40),
    Field::reserved(4, 44),
];

pub const NODE_HEADER: &[Field] = iort_node_fields![];

const NODE: RecordHeader = RecordHeader {
    schema: NODE_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "IORT Node",
};

pub const ITS_GROUP: &[Field] = iort_node_fields![Field::dec("Number of ITSs", 4, 16)];

pub const ITS_IDENTIFIER: &[Field] = &[Field::dec("GIC ITS Identifier", 4, 0)];

pub const NAMED_COMPONENT: &[Field] = iort_node_fields![
    Field::hex("Node Flags", 4, 16),
    Field::hex("Memory access properties", 8, 20),
    Field::dec("Device memory address size limit", 1, 28),
];

pub const ROOT_COMPLEX: &[Field] = iort_node_fields![
    Field::hex("Memory access properties", 8, 16),
    Field::hex("ATS Attribute", 4, 24),
    Field::hex("PCI Segment number", 4, 28),
    Field::dec("Memory access size limit", 1, 32),
    Field::hex("PASID capabilities", 2, 33),
    Field::reserved(1, 35),
    Field::hex("Flags", 4, 36),
];

pub const SMMU_V1_V2: &[Field] = iort_node_fields![
    Field::hex("Base Address", 8, 16),
    Field::hex("Span", 8, 24),
    Field::dec("Model", 4, 32),
    Field::hex("Flags", 4, 36),
    Field::dec("Reference to Global Interrupt Array", 4, 40),
    Field::dec("Number of context interrupts", 4, 44),
    Field::dec("Reference to Context Interrupt Array", 4, 48),
    Field::dec("Number of PMU Interrupts", 4, 52),
    Field::dec("Reference to PMU Interrupt Array", 4, 56),
];

pub const SMMU_GLOBAL_INTERRUPTS: &[Field] = &[
    Field::hex("SMMU_NSgIrpt", 4, 0),
    Field::hex("SMMU_NSgIrpt interrupt flags", 4, 4),
    Field::hex("SMMU_NSgCfgIrpt", 4, 8),
    Field::hex("SMMU_NSgCfgIrpt interrupt flags", 4, 12),
];

pub const SMMU_INTERRUPT: &[Field] = &[
    Field::hex("Interrupt GSIV", 4, 0),
    Field::hex("Flags", 4, 4),
];

pub const SMMU_V3: &[Field] = iort_node_fields![
    Field::hex("Base Address", 8, 16),
    Field::hex("Flags", 4, 24),
    Field::reserved(4, 28),
    Field::hex("VATOS Address", 8, 32),
    Field::dec("Model", 4, 40),
    Field::hex("Event", 4, 44),
    Field::hex("PRI", 4, 48),
    Field::hex("GERR", 4, 52),
    Field::hex("Sync", 4, 56),
    Field::hex("Proximity domain", 4, 60),
    Field::dec("Device ID mapping index", 4, 64),
];

pub const PMCG: &[Field] = iort_node_fields![
    Field::hex("Page 0 Base Address", 8, 16),
    Field::hex("Overflow interrupt GSIV", 4, 24),
    Field::hex("Node reference", 4, 28),
    Field::hex("Page 1 Base Address", 8, 32),
];

pub const RMR: &[Field] = iort_node_fields![
    Field::hex("Flags", 4, 16),
    Field::dec("Number of Memory Range Descriptors", 4, 20),
    Field::dec("Reference to Memory Range Descriptors", 4, 24),
];

pub const MEMORY_RANGE_DESCRIPTOR: &[Field] = &[
    Field::hex("Physical Range offset", 8, 0),
    Field::hex("Physical Range length", 8, 8),
    Field::reserved(4, 16),
];

pub const ID_MAPPING: &[Field] = &[
    Field::hex("Input base", 4, 0),
    Field::dec("Number of IDs", 4, 4),
    Field::hex("Output base", 4, 8),
    Field::hex("Output reference", 4, 12),
    Field::hex("Flags", 4, 16),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("IORT", IORT_FIELDS),
    ("IORT Node Header", NODE_HEADER),
    ("ITS Group Node", ITS_GROUP),
    ("GIC ITS Identifier", ITS_IDENTIFIER),
    ("Named Component Node", NAMED_COMPONENT),
    ("Root Complex Node", ROOT_COMPLEX),
    ("SMMUv1/2 Node", SMMU_V1_V2),
    ("SMMU Global Interrupts", SMMU_GLOBAL_INTERRUPTS),
    ("SMMU Interrupt", SMMU_INTERRUPT),
    ("SMMUv3 Node", SMMU_V3),
    ("PMCG Node", PMCG),
    ("RMR Node", RMR),
    ("Memory Range Descriptor", MEMORY_RANGE_DESCRIPTOR),
    ("ID Mapping", ID_MAPPING),
];

/// Node types.
pub mod node {
    pub const ITS_GROUP: u64 = 0;
    pub const NAMED_COMPONENT: u64 = 1;
    pub const ROOT_COMPLEX: u64 = 2;
    pub const SMMU_V1_V2: u64 = 3;
    pub const SMMU_V3: u64 = 4;
    pub const PMCG: u64 = 5;
    pub const RMR: u64 = 6;
}

fn parse_named_component(report: &mut Report<'_>, bytes: &[u8], id_array: usize) {
    let fixed = walker::parse(report, 2, Some("Named Component Node"), bytes, NAMED_COMPONENT);
    let start = fixed.consumed();
    let end = if id_array > start {
        id_array.min(bytes.len())
    } else {
        bytes.len()
    };
    let Some(name) = bytes.get(start..end).filter(|n| !n.is_empty()) else {
        report_error!(report, "Named Component Node: Device Object Name is missing.");
        return;
    };
    report.indented(2, |report| {
        report.field_name(2, "Device Object Name");
        render_ascii_z(report, name);
        report!(report, "\n");
    });
    if !name.contains(&0) {
        report_error!(report, "Named Component Node: Device Object Name is not NUL terminated.");
    }
}

fn parse_node(report: &mut Report<'_>, kind: u64, bytes: &[u8]) {
    let header = walker::peek(bytes, NODE_HEADER);
    let mappings = header.u64("Number of ID mappings").unwrap_or(0);
    let id_array = header.usize("Reference to ID Array").unwrap_or(0);

    match kind {
        node::ITS_GROUP => {
            let its = walker::parse(report, 2, Some("ITS Group Node"), bytes, ITS_GROUP);
            parse_bounded_array(
                report,
                "GIC ITS Identifier",
                bytes,
                Some(its.consumed()),
                its.u64("Number of ITSs"),
                ITS_IDENTIFIER,
            );
            if mappings != 0 {
                report_error!(
                    report,
                    "ITS Group Node: ID Mappings count must be zero, found {mappings}."
                );
            }
            return;
        }
        node::NAMED_COMPONENT => parse_named_component(report, bytes, id_array),
        node::ROOT_COMPLEX => {
            walker::parse(report, 2, Some("Root Complex Node"), bytes, ROOT_COMPLEX);
        }
        node::SMMU_V1_V2 => {
            let smmu = walker::parse(report, 2, Some("SMMUv1/2 Node"), bytes, SMMU_V1_V2);
            parse_bounded_array(
                report,
                "SMMU Global Interrupts",
                bytes,
                smmu.usize("Reference to Global Interrupt Array"),
                Some(1),
                SMMU_GLOBAL_INTERRUPTS,
            );
            parse_bounded_array(
                report,
                "Context Interrupt",
                bytes,
                smmu.usize("Reference to Context Interrupt Array"),
                smmu.u64("Number of context interrupts"),
                SMMU_INTERRUPT,
            );
            parse_bounded_array(
                report,
                "PMU Interrupt",
                bytes,
                smmu.usize("Reference to PMU Interrupt Array"),
                smmu.u64("Number of PMU Interrupts"),
                SMMU_INTERRUPT,
            );
        }
        node::SMMU_V3 => {
            walker::parse(report, 2, Some("SMMUv3 Node"), bytes, SMMU_V3);
        }
        node::PMCG => {
            walker::parse(report, 2, Some("PMCG Node"), bytes, PMCG);
            if mappings > 1 {
                report_error!(
                    report,
                    "PMCG Node: ID Mappings count must not exceed 1, found {mappings}."
                );
            }
        }
        node::RMR => {
            let rmr = walker::parse(report, 2, Some("RMR Node"), bytes, RMR);
            parse_bounded_array(
                report,
                "Memory Range Descriptor",
                bytes,
                rmr.usize("Reference to Memory Range Descriptors"),
                rmr.u64("Number of Memory Range Descriptors"),
                MEMORY_RANGE_DESCRIPTOR,
            );
        }
        _ => {
            report_error!(report, "Unknown IORT Node Type {kind}.");
            return;
        }
    }

    parse_bounded_array(report, "ID Mapping", bytes, Some(id_array), Some(mappings), ID_MAPPING);
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(iort) = parse_fixed(report, "IORT", table.bytes, IORT_FIELDS) else {
        return;
    };
    let (Some(count), Some(offset)) = (
        iort.u64("Number of IORT Nodes"),
        iort.usize("Offset to Array of IORT Nodes"),
    ) else {
        return;
    };
    if offset < iort.consumed() || (count > 0 && offset >= table.bytes.len()) {
        report_error!(report, "Invalid Offset to Array of IORT Nodes: {offset}.");
        return;
    }

    let mut nodes = Records::new("IORT", table.bytes, offset, NODE).limit(count);
    while let Some(record) = nodes.next_record(report) {
        parse_node(report, record.kind, record.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::testing::{table, trace};
    use alloc::vec::Vec;

    /// An IORT holding one ITS Group node with a single ITS and `mappings`
    /// declared ID mappings.
    fn iort_with_its_group(mappings: u32) -> Vec<u8> {
        let mut body = vec![0u8; 12];
        body[0..4].copy_from_slice(&1u32.to_le_bytes());
        body[4..8].copy_from_slice(&48u32.to_le_bytes());
        let mut its = [0u8; 24];
        its[0] = u8::try_from(node::ITS_GROUP).unwrap();
        its[1] = 24;
        its[8..12].copy_from_slice(&mappings.to_le_bytes());
        its[12..16].copy_from_slice(&24u32.to_le_bytes());
        its[16] = 1;
        body.extend_from_slice(&its);
        table(b"IORT", 5, &body)
    }

    #[test]
    fn its_group_without_mappings_is_clean() {
        let (diagnostics, out) = trace(&iort_with_its_group(0));
        assert!(diagnostics.is_clean(), "{out}");
        assert!(out.contains("GIC ITS Identifier"));
    }

    #[test]
    fn its_group_with_mappings_is_an_error() {
        let (diagnostics, out) = trace(&iort_with_its_group(2));
        assert_eq!(diagnostics.errors(), 1);
        assert!(out.contains("ID Mappings count must be zero, found 2"));
    }
}
