//! # MADT (Multiple APIC Description Table, signature `APIC`)
//!
//! A fixed part followed by interrupt controller structures, each starting
//! with a one-byte Type and a one-byte Length.

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::format::le_value_any;
use crate::options::ArchProfile;
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use bitfield_struct::bitfield;

pub const MADT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Local Interrupt Controller Address", 4, 36),
    Field::hex("Flags", 4, 40),
];

pub const INTERRUPT_CONTROLLER_HEADER: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
];

const STRUCTURE: RecordHeader = RecordHeader {
    schema: INTERRUPT_CONTROLLER_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "Interrupt Controller Structure",
};

/// GICC structure flags.
#[bitfield(u32)]
pub struct GiccFlags {
    pub enabled: bool,
    pub performance_interrupt_mode: bool,
    pub vgic_maintenance_interrupt_mode: bool,
    /// Only meaningful while `enabled` is clear.
    pub online_capable: bool,
    #[bits(28)]
    __: u32,
}

/// Whether `intid` is a PPI: 16-31, or 1056-1119 in the extended range.
#[must_use]
pub const fn is_ppi(intid: u64) -> bool {
    matches!(intid, 16..=31 | 1056..=1119)
}

fn validate_gicc_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = GiccFlags::from_bits(u32::try_from(le_value_any(bytes)).unwrap_or(0));
    if flags.enabled() && flags.online_capable() {
        report_error!(report, "Online Capable must be zero when the Enabled flag is set.");
    }
}

fn validate_spe_overflow_interrupt(report: &mut Report<'_>, bytes: &[u8]) {
    let intid = le_value_any(bytes);
    if intid == 0 || report.profile() != ArchProfile::Arm {
        return;
    }
    if !is_ppi(intid) {
        report_error!(
            report,
            "SPE Overflow Interrupt ID of {intid} is not in the allowed PPI ID ranges of 16-31 or \
            1056-1119."
        );
    } else if intid != 21 {
        report_warning!(
            report,
            "SBSA recommends 21 as the SPE Overflow Interrupt ID. Found {intid}."
        );
    }
}

fn validate_trbe_interrupt(report: &mut Report<'_>, bytes: &[u8]) {
    let intid = le_value_any(bytes);
    if intid != 0 && report.profile() == ArchProfile::Arm && !is_ppi(intid) {
        report_error!(
            report,
            "TRBE Interrupt ID of {intid} is not in the allowed PPI ID ranges of 16-31 or \
            1056-1119."
        );
    }
}

pub const LOCAL_APIC: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("ACPI Processor UID", 1, 2),
    Field::hex("APIC ID", 1, 3),
    Field::hex("Flags", 4, 4),
];

pub const IO_APIC: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("I/O APIC ID", 1, 2),
    Field::reserved(1, 3),
    Field::hex("I/O APIC Address", 4, 4),
    Field::hex("Global System Interrupt Base", 4, 8),
];

pub const INTERRUPT_SOURCE_OVERRIDE: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Bus", 1, 2).check(Validator::Zero),
    Field::hex("Source", 1, 3),
    Field::hex("Global System Interrupt", 4, 4),
    Field::hex("Flags", 2, 8),
];

pub const NMI_SOURCE: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Flags", 2, 2),
    Field::hex("Global System Interrupt", 4, 4),
];

pub const LOCAL_APIC_NMI: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("ACPI Processor UID", 1, 2),
    Field::hex("Flags", 2, 3),
    Field::hex("Local APIC LINT#", 1, 5),
];

pub const LOCAL_APIC_ADDRESS_OVERRIDE: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("Local APIC Address", 8, 4),
];

pub const LOCAL_X2APIC: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("X2APIC ID", 4, 4),
    Field::hex("Flags", 4, 8),
    Field::hex("ACPI Processor UID", 4, 12),
];

pub const LOCAL_X2APIC_NMI: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Flags", 2, 2),
    Field::hex("ACPI Processor UID", 4, 4),
    Field::hex("Local x2APIC LINT#", 1, 8),
    Field::reserved(3, 9),
];

pub const GICC: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("CPU Interface Number", 4, 4),
    Field::hex("ACPI Processor UID", 4, 8),
    Field::hex("Flags", 4, 12).check_with(validate_gicc_flags),
    Field::hex("Parking Protocol Version", 4, 16),
    Field::hex("Performance Interrupt GSIV", 4, 20),
    Field::hex("Parked Address", 8, 24),
    Field::hex("Physical Base Address", 8, 32),
    Field::hex("GICV", 8, 40),
    Field::hex("GICH", 8, 48),
    Field::hex("VGIC Maintenance interrupt", 4, 56),
    Field::hex("GICR Base Address", 8, 60),
    Field::hex("MPIDR", 8, 68),
    Field::hex("Processor Power Efficiency Class", 1, 76),
    Field::reserved(1, 77),
    Field::hex("SPE overflow Interrupt", 2, 78).check_with(validate_spe_overflow_interrupt),
    Field::hex("TRBE Interrupt", 2, 80).check_with(validate_trbe_interrupt),
];

pub const GICD: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("GIC ID", 4, 4),
    Field::hex("Physical Base Address", 8, 8),
    Field::hex("System Vector Base", 4, 16).check(Validator::Zero),
    Field::hex("GIC Version", 1, 20).check(Validator::AtMost(4)),
    Field::reserved(3, 21),
];

pub const GIC_MSI_FRAME: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("MSI Frame ID", 4, 4),
    Field::hex("Physical Base Address", 8, 8),
    Field::hex("Flags", 4, 16),
    Field::dec("SPI Count", 2, 20),
    Field::dec("SPI Base", 2, 22),
];

pub const GICR: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("Discovery Range Base Address", 8, 4),
    Field::hex("Discovery Range Length", 4, 12),
];

pub const GIC_ITS: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::reserved(2, 2),
    Field::hex("GIC ITS ID", 4, 4),
    Field::hex("Physical Base Address", 8, 8),
    Field::reserved(4, 16),
];

pub const MULTIPROCESSOR_WAKEUP: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 1, 1),
    Field::hex("Mailbox Version", 2, 2),
    Field::reserved(4, 4),
    Field::hex("Mailbox Address", 8, 8),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("MADT", MADT_FIELDS),
    ("Interrupt Controller Structure Header", INTERRUPT_CONTROLLER_HEADER),
    ("Processor Local APIC", LOCAL_APIC),
    ("I/O APIC", IO_APIC),
    ("Interrupt Source Override", INTERRUPT_SOURCE_OVERRIDE),
    ("NMI Source", NMI_SOURCE),
    ("Local APIC NMI", LOCAL_APIC_NMI),
    ("Local APIC Address Override", LOCAL_APIC_ADDRESS_OVERRIDE),
    ("Processor Local x2APIC", LOCAL_X2APIC),
    ("Local x2APIC NMI", LOCAL_X2APIC_NMI),
    ("GICC", GICC),
    ("GICD", GICD),
    ("GIC MSI Frame", GIC_MSI_FRAME),
    ("GICR", GICR),
    ("GIC ITS", GIC_ITS),
    ("Multiprocessor Wakeup", MULTIPROCESSOR_WAKEUP),
];

/// Schema and display name for an interrupt controller type.
#[must_use]
pub const fn structure(kind: u64) -> Option<(&'static str, &'static [Field])> {
    Some(match kind {
        0x0 => ("Processor Local APIC", LOCAL_APIC),
        0x1 => ("I/O APIC", IO_APIC),
        0x2 => ("Interrupt Source Override", INTERRUPT_SOURCE_OVERRIDE),
        0x3 => ("NMI Source", NMI_SOURCE),
        0x4 => ("Local APIC NMI", LOCAL_APIC_NMI),
        0x5 => ("Local APIC Address Override", LOCAL_APIC_ADDRESS_OVERRIDE),
        0x9 => ("Processor Local x2APIC", LOCAL_X2APIC),
        0xA => ("Local x2APIC NMI", LOCAL_X2APIC_NMI),
        0xB => ("GICC", GICC),
        0xC => ("GICD", GICD),
        0xD => ("GIC MSI Frame", GIC_MSI_FRAME),
        0xE => ("GICR", GICR),
        0xF => ("GIC ITS", GIC_ITS),
        0x10 => ("Multiprocessor Wakeup", MULTIPROCESSOR_WAKEUP),
        _ => return None,
    })
}

const GICD_TYPE: u64 = 0xC;

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(madt) = parse_fixed(report, "MADT", table.bytes, MADT_FIELDS) else {
        return;
    };

    let mut gicd_count = 0usize;
    let mut records = Records::new("MADT", table.bytes, madt.consumed(), STRUCTURE);
    while let Some(record) = records.next_record(report) {
        let Some((name, schema)) = structure(record.kind) else {
            report_error!(
                report,
                "Unknown Interrupt Controller Structure, Type = {}, Offset = {}.",
                record.kind,
                record.offset
            );
            continue;
        };
        if record.kind == GICD_TYPE {
            gicd_count += 1;
            if gicd_count > 1 {
                report_error!(
                    report,
                    "Only one GICD must be present, found a second at offset {}.",
                    record.offset
                );
            }
        }
        walker::parse(report, 2, Some(name), record.bytes, schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::testing::{table, trace};

    #[test]
    fn ppi_ranges() {
        assert!(is_ppi(16) && is_ppi(31) && is_ppi(1056) && is_ppi(1119));
        assert!(!is_ppi(15) && !is_ppi(32) && !is_ppi(1055) && !is_ppi(1120));
    }

    /// A MADT holding the given interrupt controller structures.
    fn madt(structures: &[&[u8]]) -> alloc::vec::Vec<u8> {
        let mut body = vec![0u8; 8];
        for s in structures {
            body.extend_from_slice(s);
        }
        table(b"APIC", 5, &body)
    }

    fn gicd() -> [u8; 24] {
        let mut s = [0u8; 24];
        s[0] = 0xC;
        s[1] = 24;
        s
    }

    #[test]
    fn single_gicd_is_clean() {
        let (diagnostics, out) = trace(&madt(&[&gicd()]));
        assert!(diagnostics.is_clean(), "{out}");
    }

    #[test]
    fn second_gicd_is_an_error() {
        let (diagnostics, out) = trace(&madt(&[&gicd(), &gicd()]));
        assert_eq!(diagnostics.errors(), 1);
        assert!(out.contains("Only one GICD"));
    }

    #[test]
    fn unknown_type_is_skipped_by_its_length() {
        let mut iosapic = [0u8; 16];
        iosapic[0] = 6;
        iosapic[1] = 16;
        let (diagnostics, out) = trace(&madt(&[&iosapic, &gicd(), &gicd()]));
        assert_eq!(diagnostics.errors(), 2);
        assert!(out.contains("Unknown Interrupt Controller Structure, Type = 6"));
        assert_eq!(out.matches("GIC Version").count(), 2);
    }

    #[test]
    fn every_known_type_has_a_schema() {
        for kind in [0u64, 1, 2, 3, 4, 5, 9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF, 0x10] {
            assert!(structure(kind).is_some(), "type {kind}");
        }
        assert!(structure(6).is_none());
    }
}
