//! # HEST (Hardware Error Source Table)
//!
//! Error source structures carry no Length field; their size follows from
//! the Type and, for machine check sources, from the number of hardware
//! banks appended to them.

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator, schema_len};
use crate::walker::{self, peek};
use crate::{Session, Table};
use alloc::format;

pub const HEST_FIELDS: &[Field] = acpi_header_fields![Field::dec("Error Source Count", 4, 36)];

pub const ERROR_SOURCE_HEADER: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::hex("Source Id", 2, 2),
];

pub const NOTIFICATION_STRUCTURE: &[Field] = &[
    Field::dec("Type", 1, 0).check(Validator::AtMost(11)),
    Field::dec("Length", 1, 1).check(Validator::OneOf(&[28])),
    Field::hex("Configuration Write Enable", 2, 2),
    Field::dec("Poll Interval", 4, 4),
    Field::hex("Vector", 4, 8),
    Field::dec("Switch To Polling Threshold Value", 4, 12),
    Field::dec("Switch To Polling Threshold Window", 4, 16),
    Field::dec("Error Threshold Value", 4, 20),
    Field::dec("Error Threshold Window", 4, 24),
];

pub const MACHINE_CHECK_BANK: &[Field] = &[
    Field::dec("Bank Number", 1, 0),
    Field::dec("Clear Status On Initialization", 1, 1).check(Validator::AtMost(1)),
    Field::dec("Status Data Format", 1, 2).check(Validator::AtMost(2)),
    Field::reserved(1, 3),
    Field::hex("Control Register MSR Address", 4, 4),
    Field::hex("Control Init Data", 8, 8),
    Field::hex("Status Register MSR Address", 4, 16),
    Field::hex("Address Register MSR Address", 4, 20),
    Field::hex("Misc Register MSR Address", 4, 24),
];

pub const MACHINE_CHECK_EXCEPTION: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::hex("Source Id", 2, 2),
    Field::reserved(2, 4),
    Field::hex("Flags", 1, 6),
    Field::dec("Enabled", 1, 7).check(Validator::AtMost(1)),
    Field::dec("Number of Records to Pre-allocate", 4, 8),
    Field::dec("Max Sections Per Record", 4, 12),
    Field::hex("Global Capability Init Data", 8, 16),
    Field::hex("Global Control Init Data", 8, 24),
    Field::dec("Number of Hardware Banks", 1, 32),
    Field::reserved(7, 33),
];

pub const CORRECTED_MACHINE_CHECK: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::hex("Source Id", 2, 2),
    Field::reserved(2, 4),
    Field::hex("Flags", 1, 6),
    Field::dec("Enabled", 1, 7).check(Validator::AtMost(1)),
    Field::dec("Number of Records to Pre-allocate", 4, 8),
    Field::dec("Max Sections Per Record", 4, 12),
    Field::nested("Notification Structure", 28, 16, NOTIFICATION_STRUCTURE),
    Field::dec("Number of Hardware Banks", 1, 44),
    Field::reserved(3, 45),
];

pub const NMI_ERROR: &[Field] = &[
    Field::dec("Type", 2, 0),
    Field::hex("Source Id", 2, 2),
    Field::reserved(4, 4),
    Field::dec("Number of Records to Pre-allocate", 4, 8),
    Field::dec("Max Sections Per Record", 4, 12),
    Field::dec("Max Raw Data Length", 4, 16),
];

macro_rules! aer_fields {
    ($($field:expr),* $(,)?) => {
        &[
            Field::dec("Type", 2, 0),
            Field::hex("Source Id", 2, 2),
            Field::reserved(2, 4),
            Field::hex("Flags", 1, 6),
            Field::dec("Enabled", 1, 7).check(Validator::AtMost(1)),
            Field::dec("Number of Records to Pre-allocate", 4, 8),
            Field::dec("Max Sections Per Record", 4, 12),
            Field::hex("Bus", 4, 16),
            Field::hex("Device", 2, 20),
            Field::hex("Function", 2, 22),
            Field::hex("Device Control", 2, 24),
            Field::reserved(2, 26),
            Field::hex("Uncorrectable Error Mask", 4, 28),
            Field::hex("Uncorrectable Error Severity", 4, 32),
            Field::hex("Correctable Error Mask", 4, 36),
            Field::hex("Advanced Error Capabilities and Control", 4, 40),
            $($field),*
        ]
    };
}

pub const ROOT_PORT_AER: &[Field] = aer_fields![Field::hex("Root Error Command", 4, 44)];

pub const DEVICE_AER: &[Field] = aer_fields![];

pub const BRIDGE_AER: &[Field] = aer_fields![
    Field::hex("Secondary Uncorrectable Error Mask", 4, 44),
    Field::hex("Secondary Uncorrectable Error Severity", 4, 48),
    Field::hex("Secondary Advanced Capabilities and Control", 4, 52),
];

macro_rules! ghes_fields {
    ($($field:expr),* $(,)?) => {
        &[
            Field::dec("Type", 2, 0),
            Field::hex("Source Id", 2, 2),
            Field::hex("Related Source Id", 2, 4),
            Field::hex("Flags", 1, 6),
            Field::dec("Enabled", 1, 7).check(Validator::AtMost(1)),
            Field::dec("Number of Records to Pre-allocate", 4, 8),
            Field::dec("Max Sections Per Record", 4, 12),
            Field::dec("Max Raw Data Length", 4, 16),
            Field::gas("Error Status Address", 20),
            Field::nested("Notification Structure", 28, 32, NOTIFICATION_STRUCTURE),
            Field::dec("Error Status Block Length", 4, 60),
            $($field),*
        ]
    };
}

pub const GHES: &[Field] = ghes_fields![];

pub const GHES_V2: &[Field] = ghes_fields![
    Field::gas("Read Ack Register", 64),
    Field::hex("Read Ack Preserve", 8, 76),
    Field::hex("Read Ack Write", 8, 84),
];

pub const DEFERRED_MACHINE_CHECK: &[Field] = CORRECTED_MACHINE_CHECK;

pub const SCHEMAS: &[NamedSchema] = &[
    ("HEST", HEST_FIELDS),
    ("Error Source Header", ERROR_SOURCE_HEADER),
    ("Hardware Error Notification Structure", NOTIFICATION_STRUCTURE),
    ("Machine Check Bank", MACHINE_CHECK_BANK),
    ("IA-32 Machine Check Exception", MACHINE_CHECK_EXCEPTION),
    ("IA-32 Corrected Machine Check", CORRECTED_MACHINE_CHECK),
    ("IA-32 NMI Error Source", NMI_ERROR),
    ("PCIe Root Port AER", ROOT_PORT_AER),
    ("PCIe Device AER", DEVICE_AER),
    ("PCIe Bridge AER", BRIDGE_AER),
    ("Generic Hardware Error Source", GHES),
    ("Generic Hardware Error Source V2", GHES_V2),
];

/// Name, fixed layout and whether machine check banks follow.
const fn error_source(kind: u64) -> Option<(&'static str, &'static [Field], bool)> {
    Some(match kind {
        0 => ("IA-32 Machine Check Exception", MACHINE_CHECK_EXCEPTION, true),
        1 => ("IA-32 Corrected Machine Check", CORRECTED_MACHINE_CHECK, true),
        2 => ("IA-32 NMI Error Source", NMI_ERROR, false),
        6 => ("PCIe Root Port AER", ROOT_PORT_AER, false),
        7 => ("PCIe Device AER", DEVICE_AER, false),
        8 => ("PCIe Bridge AER", BRIDGE_AER, false),
        9 => ("Generic Hardware Error Source", GHES, false),
        10 => ("Generic Hardware Error Source V2", GHES_V2, false),
        11 => ("IA-32 Deferred Machine Check", DEFERRED_MACHINE_CHECK, true),
        _ => return None,
    })
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(hest) = parse_fixed(report, "HEST", table.bytes, HEST_FIELDS) else {
        return;
    };
    let count = hest.u32("Error Source Count").unwrap_or(0);
    let bank_size = schema_len(MACHINE_CHECK_BANK);

    let mut offset = hest.consumed();
    for index in 0..count {
        let rest = &table.bytes[offset.min(table.bytes.len())..];
        let Some(kind) = peek(rest, ERROR_SOURCE_HEADER).value("Type") else {
            report_error!(
                report,
                "Insufficient length to read Error Source [{index}]. Offset = {offset}, Length = \
                {}.",
                table.bytes.len()
            );
            return;
        };
        let Some((name, schema, has_banks)) = error_source(kind) else {
            report_error!(
                report,
                "Unknown Error Source Type {kind} at offset {offset}. Remaining sources not parsed."
            );
            return;
        };

        let fixed = schema_len(schema);
        let banks = if has_banks {
            peek(rest, schema).u8("Number of Hardware Banks").unwrap_or(0)
        } else {
            0
        };
        let length = fixed + usize::from(banks) * bank_size;
        let Some(bytes) = rest.get(..length) else {
            report_error!(
                report,
                "{name} [{index}] of {length} bytes exceeds the table. Offset = {offset}, Length \
                = {}.",
                table.bytes.len()
            );
            return;
        };

        let title = format!("{name} [{index}]");
        walker::parse(report, 2, Some(&title), bytes, schema);
        if banks > 0 {
            walker::parse_array(
                report,
                4,
                "Machine Check Bank",
                bytes,
                fixed,
                u64::from(banks),
                MACHINE_CHECK_BANK,
            );
        }
        offset += length;
    }

    if offset < table.bytes.len() {
        report_warning!(
            report,
            "{} bytes after the last of {count} Error Sources are not described.",
            table.bytes.len() - offset
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_types_have_no_layout() {
        for kind in [3u64, 4, 5, 12] {
            assert!(error_source(kind).is_none(), "type {kind}");
        }
    }

    #[test]
    fn layouts_have_their_fixed_sizes() {
        assert_eq!(schema_len(NOTIFICATION_STRUCTURE), 28);
        assert_eq!(schema_len(MACHINE_CHECK_BANK), 28);
        assert_eq!(schema_len(MACHINE_CHECK_EXCEPTION), 40);
        assert_eq!(schema_len(CORRECTED_MACHINE_CHECK), 48);
        assert_eq!(schema_len(NMI_ERROR), 20);
        assert_eq!(schema_len(ROOT_PORT_AER), 48);
        assert_eq!(schema_len(DEVICE_AER), 44);
        assert_eq!(schema_len(BRIDGE_AER), 56);
        assert_eq!(schema_len(GHES), 64);
        assert_eq!(schema_len(GHES_V2), 92);
    }
}
