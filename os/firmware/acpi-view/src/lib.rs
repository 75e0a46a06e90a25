//! # ACPI Table Viewer and Validator
//!
//! This crate walks the graph of ACPI tables reachable from the RSDP, renders
//! every field of every table it understands, and checks the values it reads
//! against the rules of the ACPI (and companion Arm) specifications. It is the
//! engine behind the `acpiview` tool, but is written `no_std` + `alloc` so that
//! it can equally run inside firmware or an early kernel.
//!
//! ## Overview
//!
//! ```text
//! Session::run(rsdp)
//!     ↓
//! RSDP ──► XSDT ──► FADT ──► FACS
//!            │        └────► DSDT
//!            ├────► MADT, GTDT, IORT, SRAT, ...
//!            └────► SSDT, ...
//! ```
//!
//! Every table is routed through the [`Session`] dispatcher, which reads the
//! common header, decides whether the table is traced, verifies its checksum
//! and hands it to the parser registered for its [`Signature`]. Parsers are
//! thin: they describe their binary records as schemas (ordered slices of
//! [`Field`] descriptors) and let the [`walker`] do the work of locating,
//! rendering and validating every field.
//!
//! ## Key Components
//!
//! ### Field descriptors and the walker ([`field`], [`walker`])
//! * **Schemas**: `&'static [Field]` slices, one per record type
//! * **Two-step protocol**: [`walker::peek`] silently measures a record,
//!   [`walker::parse`] traces and validates it
//! * **Explicit data flow**: both return a [`Parsed`] view from which callers
//!   read the Length/Count/Offset fields that bound subsequent loops
//!
//! ### Diagnostics ([`Diagnostics`], [`Report`])
//! Validators never abort. They print an inline `ERROR:`/`WARNING:` note and
//! bump a counter in the [`Diagnostics`] context owned by the current
//! [`Report`]. Nothing is global; two sessions never share counters.
//!
//! ### Physical Memory Mapping ([`PhysMapRo`])
//! Abstract trait for reading firmware memory. Every address the walker
//! follows (XSDT entries, FADT pointers) goes through it, and every mapping is
//! fallible so that a corrupt pointer surfaces as an error, not a fault.
//!
//! ### Table catalogue ([`tables`])
//! One module per table signature, from RSDP to RIMT, plus the SBBR
//! mandatory-table validator ([`sbbr`]).
//!
//! ## Usage
//!
//! ```rust
//! use acpi_view::{PhysRegions, ReportOptions, Session};
//!
//! let memory = PhysRegions::new();
//! let mut out = String::new();
//! let mut session = Session::new(&memory, &mut out, ReportOptions::default());
//!
//! // Nothing is mapped at this address, so discovery fails cleanly.
//! assert!(session.run(0x1000).is_err());
//! ```
//!
//! ## Safety Considerations
//!
//! The crate contains no `unsafe` code. ACPI data is treated as untrusted:
//! every length, count and offset read from a table is bounds-checked
//! against the enclosing record before it is used.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

/// Print formatted trace output to a [`Report`].
macro_rules! report {
    ($report:expr, $($arg:tt)*) => {
        $report.print(core::format_args!($($arg)*))
    };
}

/// Record and print an `ERROR:` diagnostic.
macro_rules! report_error {
    ($report:expr, $($arg:tt)*) => {
        $report.error(core::format_args!($($arg)*))
    };
}

/// Record and print a `WARNING:` diagnostic.
macro_rules! report_warning {
    ($report:expr, $($arg:tt)*) => {
        $report.warning(core::format_args!($($arg)*))
    };
}

/// Expand to a schema array that starts with the nine fields of the common
/// ACPI table header, followed by the given table-specific fields.
macro_rules! acpi_header_fields {
    ($($field:expr),* $(,)?) => {
        &[
            $crate::field::Field::chars("Signature", 4, 0),
            $crate::field::Field::dec("Length", 4, 4),
            $crate::field::Field::dec("Revision", 1, 8),
            $crate::field::Field::hex("Checksum", 1, 9),
            $crate::field::Field::chars("Oem ID", 6, 10),
            $crate::field::Field::chars("Oem Table ID", 8, 16),
            $crate::field::Field::hex("Oem Revision", 4, 24),
            $crate::field::Field::chars("Creator ID", 4, 28),
            $crate::field::Field::hex("Creator Revision", 4, 32),
            $($field),*
        ]
    };
}

pub mod diagnostics;
pub mod field;
pub mod format;
pub mod header;
pub mod memory;
pub mod options;
pub mod registry;
pub mod report;
pub mod rsdp;
pub mod sbbr;
pub mod session;
pub mod signature;
pub mod tables;
pub mod walker;

pub use diagnostics::Diagnostics;
pub use field::{Field, IntFormat, Parsed, Render, Validator};
pub use memory::PhysRegions;
pub use options::{ArchProfile, ReportMode, ReportOptions, SbbrVersion};
pub use registry::{ParserRegistry, RegistryError, TableParser};
pub use report::{FileHandle, FileSink, FileSinkError, Highlight, Report, ReportSink};
pub use session::{AcpiViewError, Session, Summary, Table};
pub use signature::Signature;

/// Map a physical region and return a *read-only* byte slice for its contents.
///
/// You provide the implementation (identity map, `/dev/mem`, a memory image
/// loaded from disk, ...). Unlike a raw pointer cast, a mapping may fail: an
/// address taken from a corrupt table must be reported, not dereferenced.
pub trait PhysMapRo {
    /// Map `len` bytes starting at physical address `paddr`.
    ///
    /// # Errors
    /// Returns a [`MapError`] if any part of the range is not backed by
    /// readable memory.
    fn map_ro(&self, paddr: u64, len: usize) -> Result<&[u8], MapError>;
}

/// A physical range could not be mapped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("physical address 0x{0:x} is not mapped")]
    Unmapped(u64),
    #[error("physical range 0x{paddr:x}+0x{len:x} extends past the mapped region")]
    OutOfBounds { paddr: u64, len: usize },
    #[error("physical range 0x{paddr:x}+0x{len:x} overflows the address space")]
    Overflow { paddr: u64, len: usize },
}

/// 8-bit wrapping sum of all bytes.
#[must_use]
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}

/// Whether the bytes sum to zero modulo 256, as every ACPI checksum demands.
#[must_use]
pub fn checksum_ok(bytes: &[u8]) -> bool {
    sum(bytes) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_wraps() {
        assert_eq!(sum(&[0xFF, 0x02]), 0x01);
        assert_eq!(sum(&[]), 0);
    }

    #[test]
    fn fixing_the_checksum_byte_balances_the_buffer() {
        let mut bytes = [0x12u8, 0x34, 0x00, 0x56, 0x78, 0x9A];
        bytes[2] = 0u8.wrapping_sub(sum(&bytes));
        assert!(checksum_ok(&bytes));

        for i in [0, 1, 3, 4, 5] {
            let mut flipped = bytes;
            flipped[i] ^= 0x01;
            assert!(!checksum_ok(&flipped), "flip at {i} not detected");
        }
    }
}
