//! # APMT (Arm Performance Monitoring Unit Table)

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use alloc::format;
use bitfield_struct::bitfield;

pub const APMT_FIELDS: &[Field] = acpi_header_fields![];

pub const NODE_HEADER: &[Field] = &[
    Field::dec("Length", 2, 0),
    Field::hex("Node Flags", 1, 2),
    Field::dec("Node Type", 1, 3),
];

const NODE: RecordHeader = RecordHeader {
    schema: NODE_HEADER,
    type_field: "Node Type",
    length_field: "Length",
    what: "APMT Node",
};

#[bitfield(u8)]
pub struct NodeFlags {
    pub dual_page_extension: bool,
    /// Clear: processor. Set: processor container.
    pub processor_affinity_type: bool,
    pub atomic_64bit: bool,
    #[bits(5)]
    pub reserved: u8,
}

pub const NODE_TYPE_NAMES: [&str; 5] = [
    "Memory Controller",
    "SMMU",
    "PCIe Root Complex",
    "ACPI Device",
    "CPU Cache",
];

pub const APMT_NODE: &[Field] = &[
    Field::dec("Length", 2, 0),
    Field::hex("Node Flags", 1, 2),
    Field::dec("Node Type", 1, 3).check(Validator::AtMost(4)),
    Field::hex("Identifier", 4, 4),
    Field::hex("Node Instance Primary", 8, 8),
    Field::hex("Node Instance Secondary", 4, 16),
    Field::hex("Base Address 0", 8, 20),
    Field::hex("Base Address 1", 8, 28),
    Field::hex("Overflow Interrupt", 4, 36),
    Field::reserved(4, 40),
    Field::hex("Overflow Interrupt Flags", 4, 44),
    Field::hex("Processor Affinity", 4, 48),
    Field::hex("Implementation ID", 4, 52),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("APMT", APMT_FIELDS),
    ("APMT Node Header", NODE_HEADER),
    ("APMT Node", APMT_NODE),
];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(apmt) = parse_fixed(report, "APMT", table.bytes, APMT_FIELDS) else {
        return;
    };

    let mut records = Records::new("APMT", table.bytes, apmt.consumed(), NODE);
    let mut index = 0usize;
    while let Some(record) = records.next_record(report) {
        let kind = usize::try_from(record.kind).ok().and_then(|k| NODE_TYPE_NAMES.get(k));
        let title = format!("APMT Node [{index}] - {}", kind.copied().unwrap_or("Reserved"));
        let node = walker::parse(report, 2, Some(&title), record.bytes, APMT_NODE);
        index += 1;
        if !report.consistency_checks() {
            continue;
        }

        let flags = NodeFlags::from_bits(node.u8("Node Flags").unwrap_or(0));
        if flags.reserved() != 0 {
            report_error!(report, "APMT Node Flags reserved bits [7:3] must be zero.");
        }
        if flags.dual_page_extension() && node.u64("Base Address 1") == Some(0) {
            report_error!(
                report,
                "Base Address 1 must be set when the dual page extension is supported."
            );
        }
    }
}
