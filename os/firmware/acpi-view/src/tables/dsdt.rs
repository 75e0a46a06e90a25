//! DSDT and SSDT: definition blocks.
//!
//! Only the common header is traced. The AML that follows it is not decoded.

use super::NamedSchema;
use crate::header::{ACPI_HEADER_LENGTH, HEADER_FIELDS};
use crate::{Session, Table, walker};

pub const SCHEMAS: &[NamedSchema] = &[];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let name = if table.signature == crate::Signature::SSDT { "SSDT" } else { "DSDT" };
    let report = session.report();
    walker::parse(report, 0, Some(name), table.bytes, HEADER_FIELDS);
    report!(
        report,
        "  {} bytes of AML definition block\n",
        table.bytes.len().saturating_sub(ACPI_HEADER_LENGTH)
    );
}
