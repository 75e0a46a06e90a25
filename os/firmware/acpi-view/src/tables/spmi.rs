//! # SPMI (Service Processor Management Interface Table)

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::{Session, Table};
use bitfield_struct::bitfield;

/// IPMI interface types.
pub mod interface {
    pub const KCS: u8 = 1;
    pub const SMIC: u8 = 2;
    pub const BT: u8 = 3;
    pub const SSIF: u8 = 4;
}

/// GAS Address Space ID of the SMBus.
const SMBUS_ADDRESS_SPACE: u8 = 4;

#[bitfield(u8)]
pub struct InterruptType {
    pub sci_gpe: bool,
    pub io_apic_sapic: bool,
    #[bits(6)]
    pub reserved: u8,
}

pub const SPMI_FIELDS: &[Field] = acpi_header_fields![
    Field::dec("Interface Type", 1, 36).check(Validator::OneOf(&[1, 2, 3, 4])),
    Field::hex("Reserved", 1, 37).check(Validator::OneOf(&[1])),
    Field::hex("Specification Revision", 2, 38),
    Field::hex("Interrupt Type", 1, 40),
    Field::hex("GPE", 1, 41),
    Field::reserved(1, 42),
    Field::hex("PCI Device Flag", 1, 43),
    Field::hex("Global System Interrupt", 4, 44),
    Field::gas("Base Address", 48),
    Field::hex("PCI Segment Group/UID Byte 1", 1, 60),
    Field::hex("PCI Bus/UID Byte 2", 1, 61),
    Field::hex("PCI Device/UID Byte 3", 1, 62),
    Field::hex("PCI Function/UID Byte 4", 1, 63),
    Field::reserved(1, 64),
];

pub const SCHEMAS: &[NamedSchema] = &[("SPMI", SPMI_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(spmi) = parse_fixed(report, "SPMI", table.bytes, SPMI_FIELDS) else {
        return;
    };
    if !report.consistency_checks() {
        return;
    }

    let interrupt = InterruptType::from_bits(spmi.u8("Interrupt Type").unwrap_or(0));
    if interrupt.reserved() != 0 {
        report_error!(report, "Interrupt Type reserved bits [7:2] must be zero.");
    }
    if interrupt.sci_gpe() {
        if spmi.u8("GPE").unwrap_or(0) == 0 {
            report_warning!(report, "SCI triggered through GPE is selected but GPE is zero.");
        }
    } else if spmi.u8("GPE").unwrap_or(0) != 0 {
        report_error!(report, "GPE must be zero when the SCI/GPE interrupt type is not set.");
    }
    if !interrupt.io_apic_sapic() && spmi.u32("Global System Interrupt").unwrap_or(0) != 0 {
        report_error!(
            report,
            "Global System Interrupt must be zero when the I/O APIC/SAPIC interrupt type is not \
            set."
        );
    }

    let space = spmi.bytes("Base Address").and_then(|gas| gas.first().copied());
    if spmi.u8("Interface Type") == Some(interface::SSIF) && space != Some(SMBUS_ADDRESS_SPACE) {
        report_error!(
            report,
            "The Base Address of an SSIF interface must be in the SMBus address space."
        );
    }
}
