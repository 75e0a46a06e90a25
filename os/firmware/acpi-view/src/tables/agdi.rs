//! # AGDI (Arm Generic Diagnostic Dump and Reset Device Interface Table)

use super::{NamedSchema, parse_fixed};
use crate::field::Field;
use crate::format::le_value_any;
use crate::report::Report;
use crate::{Session, Table};
use bitfield_struct::bitfield;

#[bitfield(u8)]
pub struct AgdiFlags {
    /// Clear: signalled through SDEI. Set: through an interrupt.
    pub interrupt_signaling: bool,
    #[bits(7)]
    pub reserved: u8,
}

fn validate_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = AgdiFlags::from_bits(u8::try_from(le_value_any(bytes)).unwrap_or(0));
    if flags.reserved() != 0 {
        report_error!(report, "AGDI Flags reserved bits [7:1] must be zero.");
    }
}

pub const AGDI_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Flags", 1, 36).check_with(validate_flags),
    Field::reserved(3, 37),
    Field::hex("SDEI Event Number", 4, 40),
    Field::hex("GSIV", 4, 44),
];

pub const SCHEMAS: &[NamedSchema] = &[("AGDI", AGDI_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(agdi) = parse_fixed(report, "AGDI", table.bytes, AGDI_FIELDS) else {
        return;
    };
    if !report.consistency_checks() {
        return;
    }
    let flags = AgdiFlags::from_bits(agdi.u8("Flags").unwrap_or(0));
    if flags.interrupt_signaling() {
        if agdi.u32("GSIV") == Some(0) {
            report_error!(report, "GSIV must be set when interrupt signaling is selected.");
        }
    } else if agdi.u32("SDEI Event Number") == Some(0) {
        report_warning!(report, "SDEI signaling is selected but the SDEI Event Number is zero.");
    }
}
