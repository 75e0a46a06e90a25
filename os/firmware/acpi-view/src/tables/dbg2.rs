//! # DBG2 (Debug Port Table 2)
//!
//! Each Debug Device Information structure locates its register GAS array,
//! address sizes, namespace string and OEM data through offsets relative to
//! its own start.

use super::{NamedSchema, check_array_bounds, parse_bounded_array, parse_fixed};
use crate::field::{Field, Validator};
use crate::format::{le_u32, render_ascii_z};
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use alloc::format;

pub const DBG2_FIELDS: &[Field] = acpi_header_fields![
    Field::dec("Offset to Debug Device Info", 4, 36),
    Field::dec("Number of Debug Device Info", 4, 40),
];

pub const DEVICE_INFO_HEADER: &[Field] = &[
    Field::dec("Revision", 1, 0),
    Field::dec("Length", 2, 1),
];

const DEVICE_INFO: RecordHeader = RecordHeader {
    schema: DEVICE_INFO_HEADER,
    type_field: "Revision",
    length_field: "Length",
    what: "Debug Device Information Structure",
};

pub const DEBUG_DEVICE_INFO: &[Field] = &[
    Field::dec("Revision", 1, 0).check(Validator::Zero),
    Field::dec("Length", 2, 1),
    Field::dec("Generic Address Registers Count", 1, 3),
    Field::dec("NameSpace String Length", 2, 4),
    Field::dec("NameSpace String Offset", 2, 6),
    Field::dec("OEM Data Length", 2, 8),
    Field::dec("OEM Data Offset", 2, 10),
    Field::hex("Port Type", 2, 12).check(Validator::OneOf(&[0x8000, 0x8001, 0x8002, 0x8003])),
    Field::hex("Port SubType", 2, 14),
    Field::reserved(2, 16),
    Field::dec("Base Address Register Offset", 2, 18),
    Field::dec("Address Size Offset", 2, 20),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("DBG2", DBG2_FIELDS),
    ("Debug Device Information Header", DEVICE_INFO_HEADER),
    ("Debug Device Information", DEBUG_DEVICE_INFO),
];

fn debug_device_info(report: &mut Report<'_>, index: usize, bytes: &[u8]) {
    let title = format!("Debug Device Info [{index}]");
    let info = walker::parse(report, 2, Some(&title), bytes, DEBUG_DEVICE_INFO);
    if info.visited() < DEBUG_DEVICE_INFO.len() {
        report_error!(
            report,
            "Debug Device Info [{index}] is truncated. Length = {}.",
            bytes.len()
        );
        return;
    }

    let registers = info.u8("Generic Address Registers Count").map(u64::from);
    parse_bounded_array(
        report,
        "Base Address Register",
        bytes,
        info.usize("Base Address Register Offset"),
        registers,
        crate::format::GAS_FIELDS,
    );

    let count = usize::from(info.u8("Generic Address Registers Count").unwrap_or(0));
    let sizes = info.usize("Address Size Offset").unwrap_or(0);
    if count > 0 && check_array_bounds(report, "Address Size", sizes, count, 4, bytes.len()) {
        for i in 0..count {
            report.field_name(4, &format!("Address Size [{i}]"));
            report!(report, "0x{:X}\n", le_u32(bytes, sizes + i * 4).unwrap_or(0));
        }
    }

    let offset = info.usize("NameSpace String Offset").unwrap_or(0);
    let length = info.usize("NameSpace String Length").unwrap_or(0);
    match bytes.get(offset..offset.saturating_add(length)) {
        Some(name) if !name.is_empty() => {
            report.field_name(4, "NameSpace String");
            render_ascii_z(report, name);
            report!(report, "\n");
            if name.last() != Some(&0) {
                report_error!(report, "NameSpace String is not NUL terminated.");
            }
        }
        _ => report_error!(
            report,
            "Invalid NameSpace String. Offset = {offset}, Length = {length}, Structure Length = \
            {}.",
            bytes.len()
        ),
    }

    let oem_length = info.usize("OEM Data Length").unwrap_or(0);
    if oem_length > 0 {
        let oem_offset = info.usize("OEM Data Offset").unwrap_or(0);
        if check_array_bounds(report, "OEM Data", oem_offset, oem_length, 1, bytes.len()) {
            report.field_name(4, "OEM Data");
            crate::format::render_bytes(report, &bytes[oem_offset..oem_offset + oem_length]);
            report!(report, "\n");
        }
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(dbg2) = parse_fixed(report, "DBG2", table.bytes, DBG2_FIELDS) else {
        return;
    };
    let (Some(offset), Some(count)) = (
        dbg2.usize("Offset to Debug Device Info"),
        dbg2.u32("Number of Debug Device Info"),
    ) else {
        return;
    };
    if offset < dbg2.consumed() || offset > table.bytes.len() {
        report_error!(
            report,
            "Invalid Offset to Debug Device Info {offset}. Table length = {}.",
            table.bytes.len()
        );
        return;
    }

    let mut records =
        Records::new("DBG2", table.bytes, offset, DEVICE_INFO).limit(u64::from(count));
    let mut index = 0;
    while let Some(record) = records.next_record(report) {
        debug_device_info(report, index, record.bytes);
        index += 1;
    }
    if index < usize::try_from(count).unwrap_or(usize::MAX) && report.consistency_checks() {
        report_error!(report, "Found {index} of {count} Debug Device Info structures.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    /// One 16550 port with one register and the name `\_SB.COM0`.
    fn device(terminated: bool) -> alloc::vec::Vec<u8> {
        let name: &[u8] = if terminated { b"\\_SB.COM0\0" } else { b"\\_SB.COM0X" };
        let mut b = vec![0u8; 22];
        b[3] = 1;
        b[12..14].copy_from_slice(&0x8000u16.to_le_bytes());
        b[18] = 22;
        b[20] = 34;
        b.extend_from_slice(&[0u8; 12]);
        b.extend_from_slice(&0x1000u32.to_le_bytes());
        b[6] = u8::try_from(b.len()).unwrap();
        b[4] = u8::try_from(name.len()).unwrap();
        b.extend_from_slice(name);
        b[1] = u8::try_from(b.len()).unwrap();
        b
    }

    fn errors(bytes: &[u8]) -> u32 {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        debug_device_info(&mut r, 0, bytes);
        r.diagnostics().errors()
    }

    #[test]
    fn complete_device_is_clean() {
        assert_eq!(errors(&device(true)), 0);
    }

    #[test]
    fn unterminated_namespace_is_reported() {
        assert_eq!(errors(&device(false)), 1);
    }

    #[test]
    fn register_array_past_the_end_is_reported() {
        let mut b = device(true);
        b[3] = 4;
        assert!(errors(&b) >= 1);
    }
}
