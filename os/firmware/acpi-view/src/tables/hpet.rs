//! # HPET (IA-PC High Precision Event Timer Table)

use super::{NamedSchema, parse_fixed};
use crate::field::Field;
use crate::format::le_value_any;
use crate::report::Report;
use crate::{Session, Table};
use bitfield_struct::bitfield;

/// Event Timer Block ID, a copy of the block's capabilities register.
#[bitfield(u32)]
pub struct EventTimerBlockId {
    pub hardware_revision: u8,
    /// Number of comparators minus one.
    #[bits(5)]
    pub comparators: u8,
    pub count_size_cap: bool,
    #[bits(1)]
    __: u8,
    pub legacy_replacement: bool,
    pub pci_vendor_id: u16,
}

/// Low nibble: 0 none, 1 4 KiB, 2 64 KiB.
fn validate_page_protection(report: &mut Report<'_>, bytes: &[u8]) {
    let protection = le_value_any(bytes) & 0x0F;
    if protection > 2 {
        report_error!(report, "Page Protection value {protection} is reserved.");
    }
}

pub const HPET_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Event Timer Block ID", 4, 36),
    Field::gas("Base Address Lower 32-bit", 40),
    Field::dec("HPET Number", 1, 52),
    Field::hex("Main Counter Minimum Clock Tick", 2, 53),
    Field::hex("Page Protection and OEM Attribute", 1, 55).check_with(validate_page_protection),
];

pub const SCHEMAS: &[NamedSchema] = &[("HPET", HPET_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(hpet) = parse_fixed(report, "HPET", table.bytes, HPET_FIELDS) else {
        return;
    };

    let id = EventTimerBlockId::from_bits(hpet.u32("Event Timer Block ID").unwrap_or(0));
    report.field_name(2, "Comparators");
    report!(
        report,
        "{} ({}-bit counter{})\n",
        u16::from(id.comparators()) + 1,
        if id.count_size_cap() { 64 } else { 32 },
        if id.legacy_replacement() { ", legacy replacement capable" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_fields() {
        // 3 comparators, 64-bit, legacy replacement, vendor 0x8086.
        let id = EventTimerBlockId::from_bits(0x8086_A201);
        assert_eq!(id.hardware_revision(), 1);
        assert_eq!(id.comparators(), 2);
        assert!(id.count_size_cap());
        assert!(id.legacy_replacement());
        assert_eq!(id.pci_vendor_id(), 0x8086);
    }
}
