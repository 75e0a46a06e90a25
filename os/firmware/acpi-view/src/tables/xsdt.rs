//! XSDT and RSDT: the root tables listing every other table.
//!
//! Both carry the common header followed by an array of physical addresses,
//! 64-bit in the XSDT and 32-bit in the RSDT. Only the XSDT is followed.

use super::NamedSchema;
use crate::format::{le_u32, le_u64};
use crate::header::{ACPI_HEADER_LENGTH, AcpiHeader, HEADER_FIELDS};
use crate::{Session, Table, walker};
use alloc::format;
use alloc::vec::Vec;

pub const SCHEMAS: &[NamedSchema] = &[];

/// Trace the entry list and return the non-null addresses.
fn entries(session: &mut Session<'_>, name: &str, table: &Table<'_>, width: usize) -> Vec<u64> {
    let report = session.report();
    let header = walker::parse(report, 0, Some(name), table.bytes, HEADER_FIELDS);
    if header.consumed() < ACPI_HEADER_LENGTH {
        report_error!(report, "{name}: Insufficient table length {}.", table.bytes.len());
        return Vec::new();
    }

    let list = &table.bytes[ACPI_HEADER_LENGTH..];
    if list.len() % width != 0 {
        report_error!(
            report,
            "{name}: Entry area of {} bytes is not a multiple of the entry size {width}.",
            list.len()
        );
    }

    let addresses: Vec<u64> = list
        .chunks_exact(width)
        .map(|entry| {
            if width == 8 {
                le_u64(entry, 0).unwrap_or(0)
            } else {
                le_u32(entry, 0).map_or(0, u64::from)
            }
        })
        .collect();

    let mut valid = Vec::with_capacity(addresses.len());
    for (i, &address) in addresses.iter().enumerate() {
        let label = match session.signature_at(address).filter(|_| address != 0) {
            Some(signature) => format!("Entry[{i}] - {signature}"),
            None => format!("Entry[{i}]"),
        };
        let report = session.report();
        report.field_name(2, &label);
        report!(report, "0x{address:X}\n");
        if address == 0 {
            report_error!(report, "{name}: Entry[{i}] is NULL.");
        } else {
            valid.push(address);
        }
    }
    valid
}

pub(crate) fn parse_xsdt(session: &mut Session<'_>, table: &Table<'_>) {
    if let Some(header) = AcpiHeader::read(table.bytes) {
        session.set_root_oem(&header);
    }
    for address in entries(session, "XSDT", table, 8) {
        session.process_table(address);
    }
}

/// The RSDT is traced but not followed; ACPI 2.0+ firmware lists the same
/// tables in the XSDT.
pub(crate) fn parse_rsdt(session: &mut Session<'_>, table: &Table<'_>) {
    let _ = entries(session, "RSDT", table, 4);
}
