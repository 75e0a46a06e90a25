//! # TPM2 (Trusted Platform Module 2 Table)
//!
//! The fixed part is followed by 12 bytes of start-method-specific
//! parameters and, optionally, the event log area.

use super::{NamedSchema, parse_fixed};
use crate::field::{Field, Validator};
use crate::walker;
use crate::{Session, Table};

/// Start method values.
pub mod start_method {
    pub const ACPI: u64 = 2;
    pub const MMIO: u64 = 6;
    pub const CRB: u64 = 7;
    pub const CRB_ACPI: u64 = 8;
    pub const CRB_ARM_SMC: u64 = 11;
    pub const FIFO_I2C: u64 = 12;
    pub const CRB_ARM_FFA: u64 = 15;
}

pub const TPM2_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("Platform Class", 2, 36).check(Validator::AtMost(1)),
    Field::reserved(2, 38),
    Field::hex("Address of CRB Control Area", 8, 40),
    Field::dec("Start Method", 4, 48).check(Validator::OneOf(&[
        start_method::ACPI,
        start_method::MMIO,
        start_method::CRB,
        start_method::CRB_ACPI,
        start_method::CRB_ARM_SMC,
        start_method::FIFO_I2C,
        start_method::CRB_ARM_FFA,
    ])),
];

pub const ARM_SMC_PARAMETERS: &[Field] = &[
    Field::hex("Interrupt", 4, 0),
    Field::hex("Flags", 1, 4),
    Field::hex("Operation Flags", 1, 5),
    Field::reserved(2, 6),
    Field::hex("SMC/HVC Function ID", 4, 8),
];

pub const LOG_AREA: &[Field] = &[
    Field::dec("Log Area Minimum Length", 4, 0),
    Field::hex("Log Area Start Address", 8, 4),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("TPM2", TPM2_FIELDS),
    ("Arm SMC Start Method Parameters", ARM_SMC_PARAMETERS),
    ("TPM2 Log Area", LOG_AREA),
];

const PARAMETERS_LENGTH: usize = 12;

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(tpm2) = parse_fixed(report, "TPM2", table.bytes, TPM2_FIELDS) else {
        return;
    };

    let start = tpm2.consumed();
    let rest = &table.bytes[start..];
    let (parameters, log) = rest.split_at(rest.len().min(PARAMETERS_LENGTH));
    if !parameters.is_empty() {
        if tpm2.value("Start Method") == Some(start_method::CRB_ARM_SMC) {
            walker::parse(
                report,
                2,
                Some("Start Method Specific Parameters for Arm SMC"),
                parameters,
                ARM_SMC_PARAMETERS,
            );
        } else {
            report.field_name(2, "Start Method Specific Parameters");
            crate::format::render_bytes(report, parameters);
            report!(report, "\n");
        }
    }

    if log.is_empty() {
        return;
    }
    let area = walker::parse(report, 0, None, log, LOG_AREA);
    if area.visited() < LOG_AREA.len() {
        report_error!(
            report,
            "TPM2: {} bytes after the start method parameters do not hold a log area.",
            log.len()
        );
    }
}
