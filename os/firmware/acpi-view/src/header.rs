//! # Common ACPI table header
//!
//! The 36-byte prefix shared by every system description table except the
//! RSDP and the FACS.

use crate::field::Field;
use crate::format::{le_u32, le_value};
use crate::{Report, Signature, walker};

/// Size of the common header.
pub const ACPI_HEADER_LENGTH: usize = 36;

/// The common header as a schema.
pub const HEADER_FIELDS: &[Field] = acpi_header_fields![];

/// Decoded common header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AcpiHeader {
    pub signature: Signature,
    pub length: u32,
    pub revision: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
}

impl AcpiHeader {
    /// Decode the header from the start of `bytes`.
    #[must_use]
    pub fn read(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..ACPI_HEADER_LENGTH)?;
        let mut oem_id = [0u8; 6];
        oem_id.copy_from_slice(&head[10..16]);
        let mut oem_table_id = [0u8; 8];
        oem_table_id.copy_from_slice(&head[16..24]);
        Some(Self {
            signature: Signature::from_slice(head)?,
            length: le_u32(head, 4)?,
            revision: head[8],
            oem_id,
            oem_table_id,
        })
    }
}

/// Trace just the common header of a table, e.g. for signatures without a
/// registered parser.
pub fn dump_header(report: &mut Report<'_>, bytes: &[u8]) {
    walker::parse(report, 0, Some("ACPI Table Header"), bytes, HEADER_FIELDS);
}

/// Check that the header's Length is plausible for a table with a fixed
/// body of `minimum` bytes. Returns `false` after reporting if it is not.
pub fn check_minimum_length(
    report: &mut Report<'_>,
    name: &str,
    bytes: &[u8],
    minimum: usize,
) -> bool {
    if bytes.len() < minimum {
        report_error!(
            report,
            "{name}: Table length {} is shorter than the minimum of {minimum} bytes.",
            bytes.len()
        );
        return false;
    }
    true
}

/// Read the `Revision` byte of a standard table.
#[must_use]
pub fn revision(bytes: &[u8]) -> Option<u8> {
    bytes.get(8..9).and_then(le_value).and_then(|v| u8::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::schema_len;

    #[test]
    fn header_schema_is_36_bytes() {
        assert_eq!(schema_len(HEADER_FIELDS), ACPI_HEADER_LENGTH);
    }

    #[test]
    fn read_decodes_fields() {
        let mut b = [0u8; 36];
        b[..4].copy_from_slice(b"APIC");
        b[4..8].copy_from_slice(&0x60u32.to_le_bytes());
        b[8] = 5;
        b[10..16].copy_from_slice(b"ARMLTD");
        b[16..24].copy_from_slice(b"ARMVEXP ");
        let h = AcpiHeader::read(&b).unwrap();
        assert_eq!(h.signature, Signature::MADT);
        assert_eq!(h.length, 0x60);
        assert_eq!(h.revision, 5);
        assert_eq!(&h.oem_id, b"ARMLTD");
        assert_eq!(&h.oem_table_id, b"ARMVEXP ");
        assert!(AcpiHeader::read(&b[..35]).is_none());
    }
}
