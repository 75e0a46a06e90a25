//! # Field formatters
//!
//! Pure renderers for the data shapes found in ACPI tables: little-endian
//! integers of 1, 2, 4 and 8 bytes, fixed character runs, GUIDs, Generic
//! Address Structures and raw hex dumps. Formatters never fail; malformed
//! input renders as best-effort text.

use crate::field::{Field, IntFormat};
use crate::Report;

/// Little-endian `u16` at `offset`, if in bounds.
#[inline]
#[must_use]
pub fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

/// Little-endian `u32` at `offset`, if in bounds.
#[inline]
#[must_use]
pub fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Little-endian `u64` at `offset`, if in bounds.
///
/// Composed from two 32-bit halves; no 8-byte load is ever issued against
/// table memory.
#[inline]
#[must_use]
pub fn le_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    let lo = le_u32(bytes, offset)?;
    let hi = le_u32(bytes, offset.checked_add(4)?)?;
    Some(u64::from(lo) | (u64::from(hi) << 32))
}

/// Little-endian value of a 1, 2, 4 or 8 byte field.
#[must_use]
pub fn le_value(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        1 => Some(u64::from(bytes[0])),
        2 => le_u16(bytes, 0).map(u64::from),
        4 => le_u32(bytes, 0).map(u64::from),
        8 => le_u64(bytes, 0),
        _ => None,
    }
}

/// Little-endian value of any field up to 8 bytes (e.g. 3-byte proximity
/// domain fragments).
#[must_use]
pub fn le_value_any(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .rev()
        .fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// Print an integer field. Returns `false` if the width is unsupported.
pub fn render_int(report: &mut Report<'_>, format: IntFormat, bytes: &[u8]) -> bool {
    let Some(v) = le_value(bytes) else {
        return false;
    };
    match format {
        IntFormat::Hex => report!(report, "0x{v:X}"),
        IntFormat::Dec => report!(report, "{v}"),
    }
    true
}

/// Print a fixed character run; unprintable bytes appear as `.`.
pub fn render_chars(report: &mut Report<'_>, bytes: &[u8]) {
    for &b in bytes {
        let c = if b.is_ascii_graphic() || b == b' ' {
            char::from(b)
        } else {
            '.'
        };
        report!(report, "{c}");
    }
}

/// Print bytes as space separated hex pairs.
pub fn render_bytes(report: &mut Report<'_>, bytes: &[u8]) {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            report!(report, " ");
        }
        report!(report, "{b:02X}");
    }
}

/// Print a NUL-terminated ASCII string, stopping at the terminator or the end
/// of the buffer.
pub fn render_ascii_z(report: &mut Report<'_>, bytes: &[u8]) {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    render_chars(report, &bytes[..end]);
}

/// Print a 16-byte GUID in registry format.
pub fn render_guid(report: &mut Report<'_>, bytes: &[u8]) {
    let (Some(d1), Some(d2), Some(d3), Some(d4)) = (
        le_u32(bytes, 0),
        le_u16(bytes, 4),
        le_u16(bytes, 6),
        bytes.get(8..16),
    ) else {
        render_bytes(report, bytes);
        return;
    };
    report!(
        report,
        "{{{d1:08X}-{d2:04X}-{d3:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
        d4[0],
        d4[1],
        d4[2],
        d4[3],
        d4[4],
        d4[5],
        d4[6],
        d4[7]
    );
}

/// Hex and ASCII side-by-side dump of a memory range.
pub fn dump_raw(report: &mut Report<'_>, address: u64, bytes: &[u8]) {
    report.end_line();
    report!(report, "Address  : 0x{address:X}\n");
    report!(report, "Length   : {}\n\n", bytes.len());

    for (row, chunk) in bytes.chunks(16).enumerate() {
        report!(report, "{:08X} : ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => report!(report, "{b:02X} "),
                None => report!(report, "   "),
            }
            if i == 7 {
                report!(report, "- ");
            }
        }
        report!(report, "  ");
        render_chars(report, chunk);
        report!(report, "\n");
    }
    report!(report, "\n");
}

fn validate_access_size(report: &mut Report<'_>, bytes: &[u8]) {
    if bytes[0] > 4 {
        report_error!(
            report,
            "Invalid Access Size {}. Must be 0 (undefined) to 4 (QWORD).",
            bytes[0]
        );
    }
}

/// Generic Address Structure.
pub const GAS_FIELDS: &[Field] = &[
    Field::hex("Address Space ID", 1, 0),
    Field::hex("Register Bit Width", 1, 1),
    Field::hex("Register Bit Offset", 1, 2),
    Field::hex("Access Size", 1, 3).check_with(validate_access_size),
    Field::hex("Address", 8, 4),
];

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn rendered(f: impl FnOnce(&mut Report<'_>)) -> String {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        f(&mut r);
        drop(r);
        out
    }

    #[test]
    fn integers_by_width() {
        assert_eq!(rendered(|r| assert!(render_int(r, IntFormat::Hex, &[0xAB]))), "0xAB");
        assert_eq!(rendered(|r| assert!(render_int(r, IntFormat::Dec, &[0x34, 0x12]))), "4660");
        assert_eq!(
            rendered(|r| assert!(render_int(r, IntFormat::Hex, &[1, 0, 0, 0, 0, 0, 0, 0x80]))),
            "0x8000000000000001"
        );
        assert_eq!(rendered(|r| assert!(!render_int(r, IntFormat::Hex, &[1, 2, 3]))), "");
    }

    #[test]
    fn u64_is_read_unaligned() {
        let bytes = [0xFF, 1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(le_u64(&bytes, 1), Some(0x0807_0605_0403_0201));
        assert_eq!(le_u64(&bytes, 2), None);
    }

    #[test]
    fn odd_widths() {
        assert_eq!(le_value_any(&[0x01, 0x02, 0x03]), 0x0003_0201);
        assert_eq!(le_value(&[0x01, 0x02, 0x03]), None);
    }

    #[test]
    fn chars_and_guids() {
        assert_eq!(rendered(|r| render_chars(r, b"ARM\0TD")), "ARM.TD");
        let guid = [
            0x78, 0x56, 0x34, 0x12, 0xBC, 0x9A, 0xF0, 0xDE, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
            0x07, 0x08,
        ];
        assert_eq!(
            rendered(|r| render_guid(r, &guid)),
            "{12345678-9ABC-DEF0-0102-030405060708}"
        );
    }

    #[test]
    fn raw_dump_rows() {
        let out = rendered(|r| dump_raw(r, 0x1000, b"0123456789ABCDEFxy"));
        assert!(out.contains("Address  : 0x1000\n"));
        assert!(out.contains("Length   : 18\n"));
        assert!(out.contains("00000000 : 30 31 32 33 34 35 36 37 - 38 39"));
        assert!(out.contains("00000010 : 78 79"));
    }
}
