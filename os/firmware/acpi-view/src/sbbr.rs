//! # SBBR mandatory tables
//!
//! Arm Server Base Boot Requirements list the tables a compliant firmware
//! must install. The check runs after the whole graph has been walked, so
//! that the instance counts are complete.

use crate::options::SbbrVersion;
use crate::{Report, Signature};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// SBBR 1.0 mandatory tables.
pub const SBBR_1_0: &[Signature] = &[
    Signature::DSDT,
    Signature::FADT,
    Signature::MADT,
    Signature::GTDT,
    Signature::DBG2,
    Signature::SPCR,
];

/// SBBR 1.1 and 1.2 mandatory tables.
pub const SBBR_1_1: &[Signature] = &[
    Signature::DSDT,
    Signature::FADT,
    Signature::MADT,
    Signature::GTDT,
    Signature::DBG2,
    Signature::SPCR,
    Signature::PPTT,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SbbrError {
    #[error("{} mandatory table(s) missing", .0.len())]
    MandatoryTablesMissing(Vec<Signature>),
}

/// The mandatory tables of `version`, in specification order.
#[must_use]
pub const fn mandatory_tables(version: SbbrVersion) -> &'static [Signature] {
    match version {
        SbbrVersion::V1_0 => SBBR_1_0,
        SbbrVersion::V1_1 | SbbrVersion::V1_2 => SBBR_1_1,
    }
}

/// Check `counts` against the mandatory list of `version`.
///
/// Every missing table is reported as a separate error; a single
/// informational line is printed if none is missing.
///
/// # Errors
/// [`SbbrError::MandatoryTablesMissing`] with exactly the missing
/// signatures.
pub fn validate(
    version: SbbrVersion,
    counts: &BTreeMap<Signature, u32>,
    report: &mut Report<'_>,
) -> Result<(), SbbrError> {
    let missing: Vec<Signature> = mandatory_tables(version)
        .iter()
        .copied()
        .filter(|sig| counts.get(sig).copied().unwrap_or(0) == 0)
        .collect();

    for sig in &missing {
        report_error!(report, "{sig} table is mandatory for SBBR {version} but was not found.");
    }

    if missing.is_empty() {
        report.info(format_args!("All mandatory SBBR {version} tables are installed."));
        Ok(())
    } else {
        Err(SbbrError::MandatoryTablesMissing(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn counts(present: &[Signature]) -> BTreeMap<Signature, u32> {
        present.iter().map(|&s| (s, 1)).collect()
    }

    #[test]
    fn reports_exactly_the_missing_tables() {
        let mut c = counts(SBBR_1_0);
        c.insert(Signature::GTDT, 0);
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        assert_eq!(
            validate(SbbrVersion::V1_0, &c, &mut r),
            Err(SbbrError::MandatoryTablesMissing(vec![Signature::GTDT]))
        );
        assert_eq!(r.diagnostics().errors(), 1);
        drop(r);
        assert!(out.contains("GTDT table is mandatory"));
        assert!(!out.contains("APIC table is mandatory"));
    }

    #[test]
    fn later_versions_require_pptt() {
        let c = counts(SBBR_1_0);
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        assert!(validate(SbbrVersion::V1_0, &c, &mut r).is_ok());
        assert_eq!(
            validate(SbbrVersion::V1_2, &c, &mut r),
            Err(SbbrError::MandatoryTablesMissing(vec![Signature::PPTT]))
        );
        drop(r);
        assert_eq!(out.matches("INFO: All mandatory SBBR").count(), 1);
    }
}
