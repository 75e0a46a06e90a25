//! # RASF (ACPI RAS Feature Table)
//!
//! Only names the PCC subspace through which the RAS features are driven.

use super::{NamedSchema, parse_fixed};
use crate::field::Field;
use crate::{Session, Table};

pub const RASF_FIELDS: &[Field] =
    acpi_header_fields![Field::bytes("RASF Platform Communication Channel Identifier", 12, 36)];

pub const SCHEMAS: &[NamedSchema] = &[("RASF", RASF_FIELDS)];

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let _ = parse_fixed(session.report(), "RASF", table.bytes, RASF_FIELDS);
}
