//! # PCCT (Platform Communications Channel Table)

use super::{NamedSchema, parse_fixed};
use crate::field::Field;
use crate::format::le_value_any;
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use alloc::format;
use bitfield_struct::bitfield;

pub const PCCT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Flags", 4, 36),
    Field::reserved(8, 40),
];

pub const SUBSPACE_HEADER: &[Field] = &[Field::dec("Type", 1, 0), Field::dec("Length", 1, 1)];

const SUBSPACE: RecordHeader = RecordHeader {
    schema: SUBSPACE_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "PCC Subspace Structure",
};

/// Subspace IDs are one byte wide.
pub const MAX_SUBSPACES: usize = 256;

#[bitfield(u8)]
pub struct PlatformInterruptFlags {
    pub interrupt_polarity: bool,
    pub interrupt_mode: bool,
    #[bits(6)]
    pub reserved: u8,
}

fn validate_interrupt_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = PlatformInterruptFlags::from_bits(u8::try_from(le_value_any(bytes)).unwrap_or(0));
    if flags.reserved() != 0 {
        report_error!(report, "Platform Interrupt Flags reserved bits [7:2] must be zero.");
    }
}

fn validate_range_length(report: &mut Report<'_>, bytes: &[u8]) {
    let length = le_value_any(bytes);
    if length < 8 {
        report_error!(report, "Memory Range Length of {length} is below the minimum of 8.");
    }
}

fn validate_extended_range_length(report: &mut Report<'_>, bytes: &[u8]) {
    let length = le_value_any(bytes);
    if length < 16 {
        report_error!(report, "Memory Range Length of {length} is below the minimum of 16.");
    }
}

pub const GENERIC_SUBSPACE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(6, 2),
    Field::hex("Base Address", 8, 8),
    Field::hex("Memory Range Length", 8, 16).check_with(validate_range_length),
    Field::gas("Doorbell Register", 24),
    Field::hex("Doorbell Preserve", 8, 36),
    Field::hex("Doorbell Write", 8, 44),
    Field::dec("Nominal Latency", 4, 52),
    Field::dec("Maximum Periodic Access Rate", 4, 56),
    Field::dec("Minimum Request Turnaround Time", 2, 60),
];

macro_rules! hw_reduced_fields {
    ($($field:expr),* $(,)?) => {
        &[
            Field::dec("Type", 1, 0),
            Field::dec("Length", 1, 1),
            Field::hex("Platform Interrupt", 4, 2),
            Field::hex("Platform Interrupt Flags", 1, 6).check_with(validate_interrupt_flags),
            Field::reserved(1, 7),
            Field::hex("Base Address", 8, 8),
            Field::hex("Memory Range Length", 8, 16).check_with(validate_range_length),
            Field::gas("Doorbell Register", 24),
            Field::hex("Doorbell Preserve", 8, 36),
            Field::hex("Doorbell Write", 8, 44),
            Field::dec("Nominal Latency", 4, 52),
            Field::dec("Maximum Periodic Access Rate", 4, 56),
            Field::dec("Minimum Request Turnaround Time", 2, 60),
            $($field),*
        ]
    };
}

pub const HW_REDUCED_SUBSPACE_1: &[Field] = hw_reduced_fields![];

pub const HW_REDUCED_SUBSPACE_2: &[Field] = hw_reduced_fields![
    Field::gas("Platform Interrupt Ack Register", 62),
    Field::hex("Platform Interrupt Ack Preserve", 8, 74),
    Field::hex("Platform Interrupt Ack Write", 8, 82),
];

/// Extended PCC subspaces, master (type 3) and slave (type 4).
pub const EXTENDED_SUBSPACE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Platform Interrupt", 4, 2),
    Field::hex("Platform Interrupt Flags", 1, 6).check_with(validate_interrupt_flags),
    Field::reserved(1, 7),
    Field::hex("Base Address", 8, 8),
    Field::hex("Memory Range Length", 4, 16).check_with(validate_extended_range_length),
    Field::gas("Doorbell Register", 20),
    Field::hex("Doorbell Preserve", 8, 32),
    Field::hex("Doorbell Write", 8, 40),
    Field::dec("Nominal Latency", 4, 48),
    Field::dec("Maximum Periodic Access Rate", 4, 52),
    Field::dec("Minimum Request Turnaround Time", 4, 56),
    Field::gas("Platform Interrupt Ack Register", 60),
    Field::hex("Platform Interrupt Ack Preserve", 8, 72),
    Field::hex("Platform Interrupt Ack Set", 8, 80),
    Field::reserved(8, 88),
    Field::gas("Command Complete Check Register", 96),
    Field::hex("Command Complete Check Mask", 8, 108),
    Field::gas("Command Complete Update Register", 116),
    Field::hex("Command Complete Update Preserve", 8, 128),
    Field::hex("Command Complete Update Set", 8, 136),
    Field::gas("Error Status Register", 144),
    Field::hex("Error Status Mask", 8, 156),
];

pub const HW_REGISTERS_SUBSPACE: &[Field] = &[
    Field::dec("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Version", 2, 2),
    Field::hex("Base Address", 8, 4),
    Field::hex("Register Length", 8, 12),
    Field::gas("Doorbell Register", 20),
    Field::hex("Doorbell Preserve", 8, 32),
    Field::hex("Doorbell Write", 8, 40),
    Field::gas("Command Complete Check Register", 48),
    Field::hex("Command Complete Check Mask", 8, 60),
    Field::gas("Error Status Register", 68),
    Field::hex("Error Status Mask", 8, 80),
    Field::dec("Nominal Latency", 4, 88),
    Field::dec("Minimum Request Turnaround Time", 4, 92),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("PCCT", PCCT_FIELDS),
    ("PCC Subspace Header", SUBSPACE_HEADER),
    ("Generic Communications Subspace", GENERIC_SUBSPACE),
    ("HW-Reduced Communications Subspace Type 1", HW_REDUCED_SUBSPACE_1),
    ("HW-Reduced Communications Subspace Type 2", HW_REDUCED_SUBSPACE_2),
    ("Extended PCC Subspace", EXTENDED_SUBSPACE),
    ("HW Registers based Communications Subspace", HW_REGISTERS_SUBSPACE),
];

const fn subspace(kind: u64) -> Option<(&'static str, &'static [Field])> {
    Some(match kind {
        0 => ("Generic Communications Subspace", GENERIC_SUBSPACE),
        1 => ("HW-Reduced Communications Subspace Type 1", HW_REDUCED_SUBSPACE_1),
        2 => ("HW-Reduced Communications Subspace Type 2", HW_REDUCED_SUBSPACE_2),
        3 => ("Extended PCC Master Subspace", EXTENDED_SUBSPACE),
        4 => ("Extended PCC Slave Subspace", EXTENDED_SUBSPACE),
        5 => ("HW Registers based Communications Subspace", HW_REGISTERS_SUBSPACE),
        _ => return None,
    })
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(pcct) = parse_fixed(report, "PCCT", table.bytes, PCCT_FIELDS) else {
        return;
    };

    let mut records = Records::new("PCCT", table.bytes, pcct.consumed(), SUBSPACE);
    let mut index = 0usize;
    while let Some(record) = records.next_record(report) {
        if index == MAX_SUBSPACES {
            report_error!(
                report,
                "PCCT holds more than {MAX_SUBSPACES} subspaces. Remaining subspaces not parsed."
            );
            return;
        }
        match subspace(record.kind) {
            Some((name, schema)) => {
                let title = format!("{name} [{index}]");
                walker::parse(report, 2, Some(&title), record.bytes, schema);
            }
            None => report_error!(
                report,
                "Unknown PCC subspace type {}, Offset = {}.",
                record.kind,
                record.offset
            ),
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::schema_len;

    #[test]
    fn subspace_sizes() {
        assert_eq!(schema_len(GENERIC_SUBSPACE), 62);
        assert_eq!(schema_len(HW_REDUCED_SUBSPACE_1), 62);
        assert_eq!(schema_len(HW_REDUCED_SUBSPACE_2), 90);
        assert_eq!(schema_len(EXTENDED_SUBSPACE), 164);
        assert_eq!(schema_len(HW_REGISTERS_SUBSPACE), 96);
    }
}
