//! # PPTT (Processor Properties Topology Table)
//!
//! A flat list of processor hierarchy nodes, caches and ID structures that
//! reference each other by their offset in the table.

use super::{NamedSchema, check_array_bounds, parse_fixed};
use crate::field::{Field, schema_len};
use crate::format::{le_u32, le_value_any};
use crate::options::ArchProfile;
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use bitfield_struct::bitfield;

pub const PPTT_FIELDS: &[Field] = acpi_header_fields![];

pub const PPTT_STRUCTURE_HEADER: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
];

const STRUCTURE: RecordHeader = RecordHeader {
    schema: PPTT_STRUCTURE_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "Processor Topology Structure",
};

#[bitfield(u32)]
pub struct ProcessorFlags {
    pub physical_package: bool,
    pub acpi_processor_id_valid: bool,
    pub processor_is_thread: bool,
    pub node_is_leaf: bool,
    pub identical_implementation: bool,
    #[bits(27)]
    __: u32,
}

#[bitfield(u32)]
pub struct CacheFlags {
    pub size_valid: bool,
    pub number_of_sets_valid: bool,
    pub associativity_valid: bool,
    pub allocation_type_valid: bool,
    pub cache_type_valid: bool,
    pub write_policy_valid: bool,
    pub line_size_valid: bool,
    pub cache_id_valid: bool,
    #[bits(24)]
    __: u32,
}

#[bitfield(u8)]
pub struct CacheAttributes {
    #[bits(2)]
    pub allocation_type: u8,
    #[bits(2)]
    pub cache_type: u8,
    pub write_policy: bool,
    #[bits(3)]
    pub reserved: u8,
}

/// Largest set count without FEAT_CCIDX (CCSIDR_EL1.NumSets is 15 bits).
pub const ARM_MAX_SETS: u64 = 1 << 15;
/// Largest set count with FEAT_CCIDX (24 bits).
pub const ARM_CCIDX_MAX_SETS: u64 = 1 << 24;
pub const ARM_MIN_LINE_SIZE: u64 = 16;
pub const ARM_MAX_LINE_SIZE: u64 = 2048;

fn validate_number_of_sets(report: &mut Report<'_>, bytes: &[u8]) {
    let sets = le_value_any(bytes);
    if sets == 0 {
        report_error!(report, "Cache number of sets must be greater than 0.");
        return;
    }
    if report.profile() != ArchProfile::Arm {
        return;
    }
    if sets > ARM_CCIDX_MAX_SETS {
        report_error!(
            report,
            "When FEAT_CCIDX is implemented the cache number of sets must be at most \
            {ARM_CCIDX_MAX_SETS}. Found {sets}."
        );
    } else if sets > ARM_MAX_SETS {
        report_warning!(
            report,
            "Cache number of sets above {ARM_MAX_SETS} is only supported with FEAT_CCIDX. Found \
            {sets}."
        );
    }
}

fn validate_associativity(report: &mut Report<'_>, bytes: &[u8]) {
    if le_value_any(bytes) == 0 {
        report_error!(report, "Cache associativity must be greater than 0.");
    }
}

fn validate_line_size(report: &mut Report<'_>, bytes: &[u8]) {
    if report.profile() != ArchProfile::Arm {
        return;
    }
    let size = le_value_any(bytes);
    if !(ARM_MIN_LINE_SIZE..=ARM_MAX_LINE_SIZE).contains(&size) {
        report_error!(
            report,
            "The cache line size must be between {ARM_MIN_LINE_SIZE} and {ARM_MAX_LINE_SIZE} \
            bytes on Arm platforms. Found {size}."
        );
    } else if !size.is_power_of_two() {
        report_error!(report, "The cache line size of {size} is not a power of 2.");
    }
}

fn validate_cache_attributes(report: &mut Report<'_>, bytes: &[u8]) {
    let attributes = CacheAttributes::from_bits(u8::try_from(le_value_any(bytes)).unwrap_or(0));
    if attributes.reserved() != 0 {
        report_error!(
            report,
            "Cache Attributes reserved bits [7:5] must be zero. Found 0x{:X}.",
            attributes.into_bits()
        );
    }
}

pub const PROCESSOR_HIERARCHY_NODE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("Flags", 4, 4),
    Field::hex("Parent", 4, 8),
    Field::hex("ACPI Processor ID", 4, 12),
    Field::dec("Number of private resources", 4, 16),
];

pub const CACHE_TYPE_STRUCTURE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("Flags", 4, 4),
    Field::hex("Next Level of Cache", 4, 8),
    Field::hex("Size", 4, 12),
    Field::dec("Number of sets", 4, 16).check_with(validate_number_of_sets),
    Field::dec("Associativity", 1, 20).check_with(validate_associativity),
    Field::hex("Attributes", 1, 21).check_with(validate_cache_attributes),
    Field::dec("Line size", 2, 22).check_with(validate_line_size),
    Field::hex("Cache ID", 4, 24),
];

pub const ID_STRUCTURE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::chars("VENDOR_ID", 4, 4),
    Field::hex("LEVEL_1_ID", 8, 8),
    Field::hex("LEVEL_2_ID", 8, 16),
    Field::hex("MAJOR_REV", 2, 24),
    Field::hex("MINOR_REV", 2, 26),
    Field::hex("SPIN_REV", 2, 28),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("PPTT", PPTT_FIELDS),
    ("Processor Topology Structure Header", PPTT_STRUCTURE_HEADER),
    ("Processor Hierarchy Node", PROCESSOR_HIERARCHY_NODE),
    ("Cache Type Structure", CACHE_TYPE_STRUCTURE),
    ("ID Structure", ID_STRUCTURE),
];

fn processor_hierarchy_node(report: &mut Report<'_>, table_length: usize, bytes: &[u8]) {
    let node =
        walker::parse(report, 2, Some("Processor Hierarchy Node"), bytes, PROCESSOR_HIERARCHY_NODE);
    let Some(count) = node.usize("Number of private resources") else {
        report_error!(report, "Insufficient length to read the Processor Hierarchy Node.");
        return;
    };
    let flags = ProcessorFlags::from_bits(node.u32("Flags").unwrap_or(0));
    if flags.processor_is_thread() && !flags.node_is_leaf() {
        report_error!(report, "A node marked as a thread must also be a leaf node.");
    }

    let start = schema_len(PROCESSOR_HIERARCHY_NODE);
    if !check_array_bounds(report, "Private Resources", start, count, 4, bytes.len()) {
        return;
    }
    for i in 0..count {
        let reference = le_u32(bytes, start + i * 4).unwrap_or(0);
        report.field_name(4, &alloc::format!("Private resources [{i}]"));
        report!(report, "0x{reference:X}\n");
        if usize::try_from(reference).ok().is_none_or(|r| r >= table_length) {
            report_error!(
                report,
                "Private resource reference 0x{reference:X} lies outside the table."
            );
        }
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(pptt) = parse_fixed(report, "PPTT", table.bytes, PPTT_FIELDS) else {
        return;
    };

    let mut records = Records::new("PPTT", table.bytes, pptt.consumed(), STRUCTURE);
    while let Some(record) = records.next_record(report) {
        match record.kind {
            0 => processor_hierarchy_node(report, table.bytes.len(), record.bytes),
            1 => {
                walker::parse(
                    report,
                    2,
                    Some("Cache Type Structure"),
                    record.bytes,
                    CACHE_TYPE_STRUCTURE,
                );
            }
            2 => {
                walker::parse(report, 2, Some("ID Structure"), record.bytes, ID_STRUCTURE);
            }
            kind => report_error!(
                report,
                "Unknown processor topology structure, Type = {kind}, Offset = {}.",
                record.offset
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn errors(profile: ArchProfile, check: fn(&mut Report<'_>, &[u8]), bytes: &[u8]) -> (u32, u32) {
        let mut out = String::new();
        let mut r = Report::new(&mut out).with_profile(profile);
        check(&mut r, bytes);
        (r.diagnostics().errors(), r.diagnostics().warnings())
    }

    #[test]
    fn line_size_limits_apply_to_arm_only() {
        assert_eq!(errors(ArchProfile::Arm, validate_line_size, &64u16.to_le_bytes()), (0, 0));
        assert_eq!(errors(ArchProfile::Arm, validate_line_size, &8u16.to_le_bytes()), (1, 0));
        assert_eq!(errors(ArchProfile::Arm, validate_line_size, &96u16.to_le_bytes()), (1, 0));
        assert_eq!(errors(ArchProfile::Generic, validate_line_size, &8u16.to_le_bytes()), (0, 0));
    }

    #[test]
    fn large_set_counts_need_ccidx() {
        assert_eq!(
            errors(ArchProfile::Arm, validate_number_of_sets, &(1u32 << 16).to_le_bytes()),
            (0, 1)
        );
        assert_eq!(
            errors(ArchProfile::Arm, validate_number_of_sets, &(1u32 << 25).to_le_bytes()),
            (1, 0)
        );
        assert_eq!(
            errors(ArchProfile::Generic, validate_number_of_sets, &0u32.to_le_bytes()),
            (1, 0)
        );
    }

    #[test]
    fn cache_attribute_reserved_bits() {
        assert_eq!(errors(ArchProfile::Generic, validate_cache_attributes, &[0x1F]), (0, 0));
        assert_eq!(errors(ArchProfile::Generic, validate_cache_attributes, &[0x20]), (1, 0));
    }
}
