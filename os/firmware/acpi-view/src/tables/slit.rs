//! # SLIT (System Locality Information Table)
//!
//! An N×N matrix of relative distances between localities. A locality's
//! distance to itself is normalised to 10 and the matrix is symmetric.

use super::{NamedSchema, parse_fixed};
use crate::field::Field;
use crate::report::Report;
use crate::{Session, Table};

pub const SLIT_FIELDS: &[Field] =
    acpi_header_fields![Field::dec("Number of System Localities", 8, 36)];

pub const SCHEMAS: &[NamedSchema] = &[("SLIT", SLIT_FIELDS)];

/// Largest locality count whose matrix can fit in a table.
pub const MAX_LOCALITIES: u64 = 0xFFFF;

/// Distance of a locality to itself.
pub const NORMALIZED_DISTANCE: u8 = 10;

/// Matrices below this size are printed as a grid.
const GRID_LIMIT: usize = 16;

/// Check the diagonal and symmetry of an N×N distance matrix.
///
/// Symmetry is checked once per pair, so one differing pair is one error.
pub fn validate_slit(report: &mut Report<'_>, localities: usize, matrix: &[u8]) {
    let Some(cells) = localities.checked_mul(localities).filter(|&c| c <= matrix.len()) else {
        report_error!(
            report,
            "SLIT matrix of {localities} localities does not fit in {} bytes.",
            matrix.len()
        );
        return;
    };
    let m = &matrix[..cells];
    for i in 0..localities {
        let diagonal = m[i * localities + i];
        if diagonal != NORMALIZED_DISTANCE {
            report_error!(
                report,
                "SLIT Element[{i}][{i}] = {diagonal}. Normalized value must be \
                {NORMALIZED_DISTANCE}."
            );
        }
        for j in (i + 1)..localities {
            let (a, b) = (m[i * localities + j], m[j * localities + i]);
            if a != b {
                report_error!(
                    report,
                    "SLIT Element[{i}][{j}] = {a} is not equal to SLIT Element[{j}][{i}] = {b}. \
                    Matrix is not symmetric."
                );
            }
        }
    }
}

fn print_matrix(report: &mut Report<'_>, localities: usize, m: &[u8]) {
    if localities == 0 {
        return;
    }
    if localities < GRID_LIMIT {
        report!(report, "\n  Locality   ");
        for j in 0..localities {
            report!(report, " ({j:3}) ");
        }
        report!(report, "\n");
        for (i, row) in m.chunks(localities).enumerate() {
            report!(report, "  ({i:3})      ");
            for v in row {
                report!(report, "  {v:3}  ");
            }
            report!(report, "\n");
        }
    } else {
        for (i, row) in m.chunks(localities).enumerate() {
            for (j, v) in row.iter().enumerate() {
                report!(report, "  SLIT Element[{i}][{j}] : {v}\n");
            }
        }
    }
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(slit) = parse_fixed(report, "SLIT", table.bytes, SLIT_FIELDS) else {
        return;
    };
    let Some(count) = slit.u64("Number of System Localities") else {
        return;
    };
    if count > MAX_LOCALITIES {
        report_error!(
            report,
            "The Number of System Localities = {count} is too large. Maximum is {MAX_LOCALITIES}. \
            Matrix not parsed."
        );
        return;
    }
    let localities = usize::try_from(count).unwrap_or(usize::MAX);
    let matrix = &table.bytes[slit.consumed()..];
    let Some(cells) = localities.checked_mul(localities).filter(|&c| c <= matrix.len()) else {
        report_error!(
            report,
            "Insufficient table length {} for a {localities}x{localities} locality matrix.",
            table.bytes.len()
        );
        return;
    };

    print_matrix(report, localities, &matrix[..cells]);
    if report.consistency_checks() {
        validate_slit(report, localities, matrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::testing::{table, trace};
    use alloc::string::String;

    fn errors(n: usize, m: &[u8]) -> u32 {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        validate_slit(&mut r, n, m);
        r.diagnostics().errors()
    }

    #[test]
    fn symmetric_matrix_with_normalized_diagonal_is_clean() {
        assert_eq!(errors(3, &[10, 20, 30, 20, 10, 40, 30, 40, 10]), 0);
    }

    #[test]
    fn one_asymmetric_pair_is_one_error() {
        assert_eq!(errors(3, &[10, 21, 30, 20, 10, 40, 30, 40, 10]), 1);
    }

    #[test]
    fn each_bad_diagonal_counts() {
        assert_eq!(errors(2, &[11, 20, 20, 12]), 2);
    }

    #[test]
    fn short_matrix_is_rejected() {
        assert_eq!(errors(3, &[10; 8]), 1);
    }

    fn slit(localities: u64, matrix: &[u8]) -> alloc::vec::Vec<u8> {
        let mut body = localities.to_le_bytes().to_vec();
        body.extend_from_slice(matrix);
        table(b"SLIT", 1, &body)
    }

    #[test]
    fn small_matrix_is_printed_as_a_grid() {
        let (diagnostics, out) = trace(&slit(2, &[10, 20, 20, 10]));
        assert!(diagnostics.is_clean(), "{out}");
        assert!(out.contains("Locality"));
    }

    #[test]
    fn too_many_localities_skips_the_matrix() {
        let (diagnostics, out) = trace(&slit(MAX_LOCALITIES + 1, &[10; 4]));
        assert_eq!(diagnostics.errors(), 1);
        assert!(out.contains("is too large"));
        assert!(!out.contains("Locality"));
        assert!(!out.contains("SLIT Element"));
    }
}
