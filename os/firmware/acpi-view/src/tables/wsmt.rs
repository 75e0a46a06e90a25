//! # WSMT (Windows SMM Security Mitigations Table)

use super::{NamedSchema, parse_fixed};
use crate::field::Field;
use crate::format::le_value_any;
use crate::report::Report;
use crate::{Session, Table};
use bitfield_struct::bitfield;

#[bitfield(u32)]
pub struct ProtectionFlags {
    pub fixed_comm_buffers: bool,
    /// Only valid together with `fixed_comm_buffers`.
    pub comm_buffer_nested_ptr_protection: bool,
    pub system_resource_protection: bool,
    #[bits(29)]
    pub reserved: u32,
}

fn validate_protection_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = ProtectionFlags::from_bits(u32::try_from(le_value_any(bytes)).unwrap_or(0));
    if flags.comm_buffer_nested_ptr_protection() && !flags.fixed_comm_buffers() {
        report_error!(
            report,
            "COMM_BUFFER_NESTED_PTR_PROTECTION is set but FIXED_COMM_BUFFERS is not."
        );
    }
    if flags.reserved() != 0 {
        report_error!(report, "Protection Flags reserved bits [31:3] must be zero.");
    }
}

pub const WSMT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Protection Flags", 4, 36).check_with(validate_protection_flags),
];

pub const SCHEMAS: &[NamedSchema] = &[("WSMT", WSMT_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(wsmt) = parse_fixed(report, "WSMT", table.bytes, WSMT_FIELDS) else {
        return;
    };
    let flags = ProtectionFlags::from_bits(wsmt.u32("Protection Flags").unwrap_or(0));
    for (set, name) in [
        (flags.fixed_comm_buffers(), "FIXED_COMM_BUFFERS"),
        (flags.comm_buffer_nested_ptr_protection(), "COMM_BUFFER_NESTED_PTR_PROTECTION"),
        (flags.system_resource_protection(), "SYSTEM_RESOURCE_PROTECTION"),
    ] {
        report.field_name(4, name);
        report!(report, "{}\n", u8::from(set));
    }
}
