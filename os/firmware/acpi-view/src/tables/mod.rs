//! # Table catalogue
//!
//! One module per table signature. Each exposes its record schemas and a
//! parser with the [`TableParser`] signature; [`register_all`] installs them
//! all in a registry and [`schemas`] lists every schema they use.

use crate::field::{Field, Parsed, schema_len};
use crate::{ParserRegistry, Report, Signature, TableParser, walker};
use alloc::vec::Vec;

pub mod aest;
pub mod agdi;
pub mod apmt;
pub mod bgrt;
pub mod dbg2;
pub mod dsdt;
pub mod einj;
pub mod erst;
pub mod facs;
pub mod fadt;
pub mod gtdt;
pub mod hest;
pub mod hmat;
pub mod hpet;
pub mod iort;
pub mod madt;
pub mod mcfg;
pub mod mpam;
pub mod pcct;
pub mod pptt;
pub mod ras2;
pub mod rasf;
pub mod rimt;
pub mod slit;
pub mod spcr;
pub mod spmi;
pub mod srat;
pub mod tpm2;
pub mod wsmt;
pub mod xsdt;

/// A named schema.
pub type NamedSchema = (&'static str, &'static [Field]);

const PARSERS: &[(Signature, TableParser)] = &[
    (Signature::RSDP, crate::rsdp::parse),
    (Signature::XSDT, xsdt::parse_xsdt),
    (Signature::RSDT, xsdt::parse_rsdt),
    (Signature::FADT, fadt::parse),
    (Signature::FACS, facs::parse),
    (Signature::DSDT, dsdt::parse),
    (Signature::SSDT, dsdt::parse),
    (Signature::MADT, madt::parse),
    (Signature::GTDT, gtdt::parse),
    (Signature::IORT, iort::parse),
    (Signature::SRAT, srat::parse),
    (Signature::SLIT, slit::parse),
    (Signature::MCFG, mcfg::parse),
    (Signature::HEST, hest::parse),
    (Signature::HMAT, hmat::parse),
    (Signature::PPTT, pptt::parse),
    (Signature::BGRT, bgrt::parse),
    (Signature::DBG2, dbg2::parse),
    (Signature::SPCR, spcr::parse),
    (Signature::TPM2, tpm2::parse),
    (Signature::WSMT, wsmt::parse),
    (Signature::MPAM, mpam::parse),
    (Signature::PCCT, pcct::parse),
    (Signature::AEST, aest::parse),
    (Signature::APMT, apmt::parse),
    (Signature::EINJ, einj::parse),
    (Signature::ERST, erst::parse),
    (Signature::HPET, hpet::parse),
    (Signature::RAS2, ras2::parse),
    (Signature::RASF, rasf::parse),
    (Signature::SPMI, spmi::parse),
    (Signature::AGDI, agdi::parse),
    (Signature::RIMT, rimt::parse),
];

/// Install every built-in parser.
pub fn register_all(registry: &mut ParserRegistry) {
    for &(signature, parser) in PARSERS {
        if let Err(e) = registry.register(signature, parser) {
            log::warn!("Built-in parser not installed: {e}");
        }
    }
}

/// Every schema used by the built-in parsers, including nested ones that
/// are only reachable through [`Render::Nested`](crate::Render::Nested).
#[must_use]
pub fn schemas() -> Vec<NamedSchema> {
    let mut all: Vec<NamedSchema> = Vec::new();
    all.push(("ACPI Table Header", crate::header::HEADER_FIELDS));
    all.push(("Generic Address Structure", crate::format::GAS_FIELDS));
    all.push(("RSDP", crate::rsdp::RSDP_FIELDS));
    for module in [
        xsdt::SCHEMAS,
        fadt::SCHEMAS,
        facs::SCHEMAS,
        dsdt::SCHEMAS,
        madt::SCHEMAS,
        gtdt::SCHEMAS,
        iort::SCHEMAS,
        srat::SCHEMAS,
        slit::SCHEMAS,
        mcfg::SCHEMAS,
        hest::SCHEMAS,
        hmat::SCHEMAS,
        pptt::SCHEMAS,
        bgrt::SCHEMAS,
        dbg2::SCHEMAS,
        spcr::SCHEMAS,
        tpm2::SCHEMAS,
        wsmt::SCHEMAS,
        mpam::SCHEMAS,
        pcct::SCHEMAS,
        aest::SCHEMAS,
        apmt::SCHEMAS,
        einj::SCHEMAS,
        erst::SCHEMAS,
        hpet::SCHEMAS,
        ras2::SCHEMAS,
        rasf::SCHEMAS,
        spmi::SCHEMAS,
        agdi::SCHEMAS,
        rimt::SCHEMAS,
    ] {
        all.extend_from_slice(module);
    }
    all
}

/// Trace the fixed part of a table. Returns `None`, after reporting, if the
/// table is too short to hold all of it.
pub(crate) fn parse_fixed<'t>(
    report: &mut Report<'_>,
    name: &str,
    bytes: &'t [u8],
    schema: &'static [Field],
) -> Option<Parsed<'t>> {
    let parsed = walker::parse(report, 0, Some(name), bytes, schema);
    if parsed.visited() < schema.len() {
        report_error!(
            report,
            "{name}: Insufficient table length. Length = {}. Expected at least {}.",
            bytes.len(),
            schema_len(schema)
        );
        return None;
    }
    Some(parsed)
}

/// Check that `count` entries of `size` bytes starting at `offset` lie inside
/// a buffer of `length` bytes. Reports and returns `false` if not.
pub(crate) fn check_array_bounds(
    report: &mut Report<'_>,
    what: &str,
    offset: usize,
    count: usize,
    size: usize,
    length: usize,
) -> bool {
    let end = count
        .checked_mul(size)
        .and_then(|bytes| bytes.checked_add(offset));
    match end {
        Some(end) if end <= length => true,
        _ => {
            report_error!(
                report,
                "Invalid {what}. Offset = {offset}, Count = {count}, Entry Size = {size}, Length \
                = {length}."
            );
            false
        }
    }
}

/// Parse `count` entries of `schema` at `offset` within `bytes`, after
/// checking they lie inside it. Missing or zero counts parse nothing.
pub(crate) fn parse_bounded_array(
    report: &mut Report<'_>,
    label: &str,
    bytes: &[u8],
    offset: Option<usize>,
    count: Option<u64>,
    schema: &'static [Field],
) {
    let (Some(offset), Some(count)) = (offset, count) else {
        return;
    };
    if count == 0 {
        return;
    }
    let entries = usize::try_from(count).unwrap_or(usize::MAX);
    if check_array_bounds(report, label, offset, entries, schema_len(schema), bytes.len()) {
        walker::parse_array(report, 4, label, bytes, offset, count, schema);
    }
}
