//! # SPCR (Serial Port Console Redirection Table)

use super::NamedSchema;
use crate::field::{Field, Validator};
use crate::format::{le_value_any, render_ascii_z};
use crate::options::ArchProfile;
use crate::report::Report;
use crate::{Session, Table, walker};

/// Interrupt Type bit for an Arm GIC interrupt.
pub const INTERRUPT_TYPE_GIC: u64 = 1 << 3;

/// Baud rate codes and their rates; 0 keeps the rate set by firmware.
pub const BAUD_RATES: &[(u64, u32)] = &[(0, 0), (3, 9600), (4, 19200), (6, 57600), (7, 115_200)];

fn validate_interrupt_type(report: &mut Report<'_>, bytes: &[u8]) {
    let kind = le_value_any(bytes);
    if report.profile() == ArchProfile::Arm && kind != INTERRUPT_TYPE_GIC {
        report_error!(
            report,
            "Interrupt Type must be 0x{INTERRUPT_TYPE_GIC:X} (ARMH GIC interrupt) on Arm \
            platforms. Found 0x{kind:X}."
        );
    }
}

fn validate_irq(report: &mut Report<'_>, bytes: &[u8]) {
    if report.profile() == ArchProfile::Arm && le_value_any(bytes) != 0 {
        report_error!(report, "IRQ is reserved and must be zero on Arm platforms.");
    }
}

fn validate_baud_rate(report: &mut Report<'_>, bytes: &[u8]) {
    let code = le_value_any(bytes);
    if !BAUD_RATES.iter().any(|&(c, _)| c == code) {
        report_error!(report, "Baud Rate code {code} is reserved. Allowed: 0, 3, 4, 6, 7.");
    }
}

pub const SPCR_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Interface Type", 1, 36),
    Field::reserved(3, 37),
    Field::gas("Base Address", 40),
    Field::hex("Interrupt Type", 1, 52).check_with(validate_interrupt_type),
    Field::hex("IRQ", 1, 53).check_with(validate_irq),
    Field::hex("Global System Interrupt", 4, 54),
    Field::dec("Baud Rate", 1, 58).check_with(validate_baud_rate),
    Field::dec("Parity", 1, 59).check(Validator::Zero),
    Field::dec("Stop Bits", 1, 60).check(Validator::OneOf(&[1])),
    Field::hex("Flow Control", 1, 61),
    Field::dec("Terminal Type", 1, 62).check(Validator::AtMost(4)),
    Field::hex("Language", 1, 63).check(Validator::Zero),
    Field::hex("PCI Device ID", 2, 64),
    Field::hex("PCI Vendor ID", 2, 66),
    Field::hex("PCI Bus Number", 1, 68),
    Field::hex("PCI Device Number", 1, 69),
    Field::hex("PCI Function Number", 1, 70),
    Field::hex("PCI Flags", 4, 71),
    Field::hex("PCI Segment", 1, 75),
    Field::dec("UART Clock Frequency", 4, 76),
    Field::dec("Precise Baud Rate", 4, 80),
    Field::dec("NameSpace String Length", 2, 84),
    Field::dec("NameSpace String Offset", 2, 86),
];

pub const SCHEMAS: &[NamedSchema] = &[("SPCR", SPCR_FIELDS)];

/// Fixed part up to UART Clock Frequency, revisions 2 and 3.
const REV2_FIXED_LENGTH: usize = 80;
/// Fixed part up to NameSpace String Offset, revision 4.
const REV4_FIXED_LENGTH: usize = 88;

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let spcr = walker::parse(report, 0, Some("SPCR"), table.bytes, SPCR_FIELDS);
    let required = if table.revision >= 4 { REV4_FIXED_LENGTH } else { REV2_FIXED_LENGTH };
    if spcr.consumed() < required {
        report_error!(
            report,
            "SPCR: Insufficient table length. Length = {}. Expected at least {required} for \
            revision {}.",
            table.bytes.len(),
            table.revision
        );
        return;
    }

    let rate =
        spcr.value("Baud Rate").and_then(|code| BAUD_RATES.iter().find(|&&(c, _)| c == code));
    if let Some(&(code, bps)) = rate
        && code != 0
    {
        report.field_name(2, "Baud Rate (bps)");
        report!(report, "{bps}\n");
    }

    if table.revision < 4 {
        return;
    }
    let offset = spcr.usize("NameSpace String Offset").unwrap_or(0);
    let length = spcr.usize("NameSpace String Length").unwrap_or(0);
    match table.bytes.get(offset..offset.saturating_add(length)) {
        Some(name) if offset >= REV4_FIXED_LENGTH && !name.is_empty() => {
            report.field_name(2, "NameSpace String");
            render_ascii_z(report, name);
            report!(report, "\n");
        }
        _ => report_error!(
            report,
            "Invalid NameSpace String. Offset = {offset}, Length = {length}, Table Length = {}.",
            table.bytes.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn diagnostics(profile: ArchProfile, check: fn(&mut Report<'_>, &[u8]), value: u8) -> u32 {
        let mut out = String::new();
        let mut r = Report::new(&mut out).with_profile(profile);
        check(&mut r, &[value]);
        r.diagnostics().errors()
    }

    #[test]
    fn only_listed_baud_rate_codes_are_valid() {
        for code in [0, 3, 4, 6, 7] {
            assert_eq!(diagnostics(ArchProfile::Generic, validate_baud_rate, code), 0);
        }
        for code in [1, 2, 5, 8] {
            assert_eq!(diagnostics(ArchProfile::Generic, validate_baud_rate, code), 1);
        }
    }

    #[test]
    fn arm_requires_gic_interrupts_and_no_irq() {
        assert_eq!(diagnostics(ArchProfile::Arm, validate_interrupt_type, 8), 0);
        assert_eq!(diagnostics(ArchProfile::Arm, validate_interrupt_type, 1), 1);
        assert_eq!(diagnostics(ArchProfile::Generic, validate_interrupt_type, 1), 0);
        assert_eq!(diagnostics(ArchProfile::Arm, validate_irq, 4), 1);
        assert_eq!(diagnostics(ArchProfile::Generic, validate_irq, 4), 0);
    }
}
