//! # RSDP/XSDP (Root/Extended System Description Pointer)
//!
//! The RSDP is the sole entry into the table graph. It has its own fixed
//! layout instead of the common header: the ACPI 1.0 part is 20 bytes and
//! carries a checksum of its own, ACPI 2.0 extends it to (at least) 36 bytes
//! with a 64-bit XSDT address and an extended checksum over the whole
//! structure. Only the XSDT is followed; the legacy RSDT is ignored.

use crate::field::Field;
use crate::format::{le_u32, le_u64};
use crate::options::ArchProfile;
use crate::report::Report;
use crate::session::{AcpiViewError, Session, Table};
use crate::{PhysMapRo, walker};

/// The 8-byte signature at the start of the RSDP.
pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// Size of the ACPI 1.0 structure covered by the first checksum.
pub const RSDP_V1_LENGTH: usize = 20;

/// Size of the ACPI 2.0 structure.
pub const RSDP_V2_LENGTH: usize = 36;

fn validate_rsdt_address(report: &mut Report<'_>, bytes: &[u8]) {
    if report.profile() == ArchProfile::Arm && bytes.iter().any(|&b| b != 0) {
        report_error!(
            report,
            "Rsdt Address = 0x{:X}. On Arm platforms the RSDT address must be 0.",
            le_u32(bytes, 0).unwrap_or(0)
        );
    }
}

fn validate_xsdt_address(report: &mut Report<'_>, bytes: &[u8]) {
    if bytes.iter().all(|&b| b == 0) {
        report_error!(report, "Xsdt Address = 0x0. The XSDT address must not be NULL.");
    }
}

/// The RSDP layout.
pub const RSDP_FIELDS: &[Field] = &[
    Field::chars("Signature", 8, 0),
    Field::hex("Checksum", 1, 8),
    Field::chars("Oem ID", 6, 9),
    Field::dec("Revision", 1, 15),
    Field::hex("RSDT Address", 4, 16).check_with(validate_rsdt_address),
    Field::dec("Length", 4, 20),
    Field::hex("XSDT Address", 8, 24).check_with(validate_xsdt_address),
    Field::hex("Extended Checksum", 1, 32),
    Field::reserved(3, 33),
];

/// Length of the structure: 20 bytes before ACPI 2.0, else its Length field.
#[must_use]
pub fn length(bytes: &[u8]) -> Option<usize> {
    let revision = *bytes.get(15)?;
    if revision < 2 {
        return Some(RSDP_V1_LENGTH);
    }
    le_u32(bytes, 20).and_then(|l| usize::try_from(l).ok())
}

/// The XSDT address of an ACPI 2.0+ RSDP.
#[must_use]
pub fn xsdt_address(bytes: &[u8]) -> Option<u64> {
    if bytes.get(15).is_none_or(|&revision| revision < 2) {
        return None;
    }
    le_u64(bytes, 24)
}

/// Map the RSDP at `address`, checking its signature and length.
///
/// # Errors
/// [`AcpiViewError::RsdpNotFound`] if the address is null, the signature does
/// not match or the declared length is too short; [`AcpiViewError::Map`] if
/// the memory cannot be read.
pub fn map(memory: &dyn PhysMapRo, address: u64) -> Result<&[u8], AcpiViewError> {
    if address == 0 {
        return Err(AcpiViewError::RsdpNotFound(address));
    }
    let v1 = memory.map_ro(address, RSDP_V1_LENGTH)?;
    if !v1.starts_with(RSDP_SIGNATURE) {
        log::debug!("No RSDP signature at 0x{address:x}");
        return Err(AcpiViewError::RsdpNotFound(address));
    }
    if v1[15] < 2 {
        return Ok(v1);
    }

    let v2 = memory.map_ro(address, RSDP_V2_LENGTH)?;
    let len = length(v2).ok_or(AcpiViewError::RsdpNotFound(address))?;
    if len < RSDP_V2_LENGTH {
        return Err(AcpiViewError::RsdpNotFound(address));
    }
    Ok(memory.map_ro(address, len)?)
}

/// Verify the ACPI 1.0 checksum and, for ACPI 2.0+, the extended checksum.
pub fn verify_checksums(report: &mut Report<'_>, bytes: &[u8]) {
    report.verify_checksum_as("Checksum", bytes.get(..RSDP_V1_LENGTH).unwrap_or(bytes));
    if bytes.len() > RSDP_V1_LENGTH {
        report.verify_checksum_as("Extended Checksum", bytes);
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let rsdp = walker::parse(report, 0, Some("RSDP"), table.bytes, RSDP_FIELDS);
    if rsdp.visited() < RSDP_FIELDS.len() {
        if table.revision >= 2 {
            report_error!(report, "RSDP: Insufficient length {}.", table.bytes.len());
        }
        return;
    }

    if let Some(xsdt) = rsdp.u64("XSDT Address").filter(|&a| a != 0) {
        session.process_table(xsdt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhysRegions;
    use crate::field::schema_len;

    fn rsdp(revision: u8, xsdt: u64) -> Vec<u8> {
        let mut b = vec![0u8; RSDP_V2_LENGTH];
        b[..8].copy_from_slice(RSDP_SIGNATURE);
        b[9..15].copy_from_slice(b"OEMID ");
        b[15] = revision;
        b[20..24].copy_from_slice(&36u32.to_le_bytes());
        b[24..32].copy_from_slice(&xsdt.to_le_bytes());
        b[8] = 0u8.wrapping_sub(crate::sum(&b[..20]));
        b[32] = 0u8.wrapping_sub(crate::sum(&b));
        b
    }

    #[test]
    fn layout_is_36_bytes() {
        assert_eq!(schema_len(RSDP_FIELDS), RSDP_V2_LENGTH);
    }

    #[test]
    fn v2_maps_full_length() {
        let mut m = PhysRegions::new();
        m.insert(0x1000, rsdp(2, 0x2000));
        let bytes = map(&m, 0x1000).unwrap();
        assert_eq!(bytes.len(), 36);
        assert_eq!(xsdt_address(bytes), Some(0x2000));
        assert!(crate::checksum_ok(&bytes[..20]));
        assert!(crate::checksum_ok(bytes));
    }

    #[test]
    fn v1_has_no_xsdt() {
        let mut m = PhysRegions::new();
        m.insert(0x1000, rsdp(0, 0));
        let bytes = map(&m, 0x1000).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(xsdt_address(bytes), None);
    }

    #[test]
    fn bad_signature_and_null_are_not_found() {
        let mut m = PhysRegions::new();
        let mut b = rsdp(2, 0x2000);
        b[0] = b'X';
        m.insert(0x1000, b);
        assert_eq!(map(&m, 0x1000), Err(AcpiViewError::RsdpNotFound(0x1000)));
        assert_eq!(map(&m, 0), Err(AcpiViewError::RsdpNotFound(0)));
    }
}
