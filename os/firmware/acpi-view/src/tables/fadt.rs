//! # FADT (Fixed ACPI Description Table, signature `FACP`)
//!
//! Besides its own fixed fields the FADT points at the FACS and the DSDT.
//! The 64-bit `X_` pointers take precedence over the legacy 32-bit ones when
//! they are present and non-zero.

use super::NamedSchema;
use crate::field::{Field, Validator};
use crate::format::le_value_any;
use crate::header::AcpiHeader;
use crate::options::ArchProfile;
use crate::report::Report;
use crate::{Session, Table, walker};
use bitfield_struct::bitfield;

/// Fixed feature flags, FADT offset 112.
#[bitfield(u32)]
pub struct FadtFlags {
    pub wbinvd: bool,
    pub wbinvd_flush: bool,
    pub proc_c1: bool,
    pub p_lvl2_up: bool,
    pub pwr_button: bool,
    pub slp_button: bool,
    pub fix_rtc: bool,
    pub rtc_s4: bool,
    pub tmr_val_ext: bool,
    pub dck_cap: bool,
    pub reset_reg_sup: bool,
    pub sealed_case: bool,
    pub headless: bool,
    pub cpu_sw_slp: bool,
    pub pci_exp_wak: bool,
    pub use_platform_clock: bool,
    pub s4_rtc_sts_valid: bool,
    pub remote_power_on_capable: bool,
    pub force_apic_cluster_model: bool,
    pub force_apic_physical_destination_mode: bool,
    /// Bit 20: no fixed hardware, everything is described by the namespace.
    pub hw_reduced_acpi: bool,
    pub low_power_s0_idle_capable: bool,
    #[bits(2)]
    pub persistent_cpu_caches: u8,
    #[bits(8)]
    __: u8,
}

fn validate_firmware_ctrl(report: &mut Report<'_>, bytes: &[u8]) {
    if report.profile() == ArchProfile::Arm && le_value_any(bytes) != 0 {
        report_error!(report, "Firmware Control must be zero for Arm platforms.");
    }
}

fn validate_x_firmware_ctrl(report: &mut Report<'_>, bytes: &[u8]) {
    if report.profile() == ArchProfile::Arm && le_value_any(bytes) != 0 {
        report_error!(report, "X Firmware Control must be zero for Arm platforms.");
    }
}

fn validate_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = FadtFlags::from_bits(u32::try_from(le_value_any(bytes)).unwrap_or(0));
    if report.profile() == ArchProfile::Arm && !flags.hw_reduced_acpi() {
        report_error!(report, "HW_REDUCED_ACPI flag must be set for Arm platforms.");
    }
}

pub const FADT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("FIRMWARE_CTRL", 4, 36).check_with(validate_firmware_ctrl),
    Field::hex("DSDT", 4, 40),
    Field::hex("Reserved", 1, 44),
    Field::hex("Preferred_PM_Profile", 1, 45).check(Validator::AtMost(8)),
    Field::hex("SCI_INT", 2, 46),
    Field::hex("SMI_CMD", 4, 48),
    Field::hex("ACPI_ENABLE", 1, 52),
    Field::hex("ACPI_DISABLE", 1, 53),
    Field::hex("S4BIOS_REQ", 1, 54),
    Field::hex("PSTATE_CNT", 1, 55),
    Field::hex("PM1a_EVT_BLK", 4, 56),
    Field::hex("PM1b_EVT_BLK", 4, 60),
    Field::hex("PM1a_CNT_BLK", 4, 64),
    Field::hex("PM1b_CNT_BLK", 4, 68),
    Field::hex("PM2_CNT_BLK", 4, 72),
    Field::hex("PM_TMR_BLK", 4, 76),
    Field::hex("GPE0_BLK", 4, 80),
    Field::hex("GPE1_BLK", 4, 84),
    Field::hex("PM1_EVT_LEN", 1, 88),
    Field::hex("PM1_CNT_LEN", 1, 89),
    Field::hex("PM2_CNT_LEN", 1, 90),
    Field::hex("PM_TMR_LEN", 1, 91),
    Field::hex("GPE0_BLK_LEN", 1, 92),
    Field::hex("GPE1_BLK_LEN", 1, 93),
    Field::hex("GPE1_BASE", 1, 94),
    Field::hex("CST_CNT", 1, 95),
    Field::hex("P_LVL2_LAT", 2, 96),
    Field::hex("P_LVL3_LAT", 2, 98),
    Field::hex("FLUSH_SIZE", 2, 100),
    Field::hex("FLUSH_STRIDE", 2, 102),
    Field::hex("DUTY_OFFSET", 1, 104),
    Field::hex("DUTY_WIDTH", 1, 105),
    Field::hex("DAY_ALRM", 1, 106),
    Field::hex("MON_ALRM", 1, 107),
    Field::hex("CENTURY", 1, 108),
    Field::hex("IAPC_BOOT_ARCH", 2, 109),
    Field::hex("Reserved", 1, 111),
    Field::hex("Flags", 4, 112).check_with(validate_flags),
    Field::gas("RESET_REG", 116),
    Field::hex("RESET_VALUE", 1, 128),
    Field::hex("ARM_BOOT_ARCH", 2, 129),
    Field::hex("FADT Minor Version", 1, 131),
    Field::hex("X_FIRMWARE_CTRL", 8, 132).check_with(validate_x_firmware_ctrl),
    Field::hex("X_DSDT", 8, 140),
    Field::gas("X_PM1a_EVT_BLK", 148),
    Field::gas("X_PM1b_EVT_BLK", 160),
    Field::gas("X_PM1a_CNT_BLK", 172),
    Field::gas("X_PM1b_CNT_BLK", 184),
    Field::gas("X_PM2_CNT_BLK", 196),
    Field::gas("X_PM_TMR_BLK", 208),
    Field::gas("X_GPE0_BLK", 220),
    Field::gas("X_GPE1_BLK", 232),
    Field::gas("SLEEP_CONTROL_REG", 244),
    Field::gas("SLEEP_STATUS_REG", 256),
    Field::hex("Hypervisor VendorIdentity", 8, 268),
];

pub const SCHEMAS: &[NamedSchema] = &[("FADT", FADT_FIELDS)];

/// Pick the 64-bit pointer when present and non-zero, else the legacy one.
fn preferred(extended: Option<u64>, legacy: Option<u32>) -> Option<u64> {
    extended
        .filter(|&a| a != 0)
        .or_else(|| legacy.map(u64::from).filter(|&a| a != 0))
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let fadt = walker::parse(report, 0, Some("FADT"), table.bytes, FADT_FIELDS);

    let flags = FadtFlags::from_bits(fadt.u32("Flags").unwrap_or(0));
    let facs = preferred(fadt.u64("X_FIRMWARE_CTRL"), fadt.u32("FIRMWARE_CTRL"));
    let dsdt = preferred(fadt.u64("X_DSDT"), fadt.u32("DSDT"));

    if facs.is_none() && report.profile() != ArchProfile::Arm && !flags.hw_reduced_acpi() {
        report_error!(
            report,
            "Both FIRMWARE_CTRL and X_FIRMWARE_CTRL are zero, but HW_REDUCED_ACPI is not set."
        );
    }
    if dsdt.is_none() {
        report_error!(report, "Both DSDT and X_DSDT are zero.");
    }

    if let (Some(root), Some(header)) = (session.root_oem(), AcpiHeader::read(table.bytes)) {
        let report = session.report();
        if root.oem_id != header.oem_id {
            report_warning!(report, "FADT OEM ID does not match the XSDT OEM ID.");
        }
        if root.oem_table_id != header.oem_table_id {
            report_warning!(report, "FADT OEM Table ID does not match the XSDT OEM Table ID.");
        }
    }

    if let Some(address) = facs {
        session.process_table(address);
    }
    if let Some(address) = dsdt {
        session.process_table(address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hw_reduced_is_bit_20() {
        assert!(FadtFlags::from_bits(1 << 20).hw_reduced_acpi());
        assert!(!FadtFlags::from_bits(1 << 21).hw_reduced_acpi());
    }

    #[test]
    fn extended_pointers_take_precedence() {
        assert_eq!(preferred(Some(0x2000), Some(0x1000)), Some(0x2000));
        assert_eq!(preferred(Some(0), Some(0x1000)), Some(0x1000));
        assert_eq!(preferred(None, Some(0x1000)), Some(0x1000));
        assert_eq!(preferred(Some(0), Some(0)), None);
    }
}
