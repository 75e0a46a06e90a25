//! # Table dispatcher
//!
//! A [`Session`] owns everything one run needs: the memory reader, the
//! report, the parser registry, the per-signature instance counts and the
//! ancestry stack that keeps recursive table references finite.
//!
//! Every table, whether reached from the RSDP, an XSDT entry or a FADT
//! pointer, goes through [`Session::process_table`]:
//!
//! ```text
//! map header ─► map Length bytes ─► count ─► mode policy (list / dump / trace)
//!                                              │
//!              parser(session, table) ◄── banner, raw dump, checksum
//!                     │
//!                     └─► process_table(referenced address) ...
//! ```

use crate::format::{dump_raw, le_u32};
use crate::header::{ACPI_HEADER_LENGTH, AcpiHeader, dump_header};
use crate::options::{ReportMode, ReportOptions};
use crate::report::{FileSink, FileSinkError, Report, ReportSink};
use crate::{Diagnostics, MapError, ParserRegistry, PhysMapRo, Signature, rsdp, sbbr};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

/// A run could not complete.
///
/// Validation findings inside tables are never errors of this kind; they are
/// counted in [`Diagnostics`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcpiViewError {
    #[error("no valid RSDP at 0x{0:x}")]
    RsdpNotFound(u64),
    #[error("the RSDP does not reference an XSDT")]
    XsdtNotFound,
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("table {signature} at 0x{address:x} declares an invalid length of {length} bytes")]
    InvalidLength {
        address: u64,
        signature: Signature,
        length: u32,
    },
    #[error("the buffer is too short to hold a table signature")]
    TruncatedTable,
    #[error("requested table {0} not found")]
    TableNotFound(Signature),
    #[error("no file sink is available for dumping tables")]
    NoFileSink,
    #[error("binary dump failed: {0}")]
    Dump(#[from] FileSinkError),
}

/// A mapped table handed to a [`TableParser`](crate::TableParser).
#[derive(Debug, Copy, Clone)]
pub struct Table<'t> {
    /// Physical address, or 0 for tables supplied as a buffer.
    pub address: u64,
    pub signature: Signature,
    pub revision: u8,
    /// Exactly the table's declared length.
    pub bytes: &'t [u8],
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub diagnostics: Diagnostics,
    /// Number of tables processed, counting repeated references.
    pub tables: u32,
    /// Mandatory tables missing for the requested SBBR version.
    pub missing_mandatory: Vec<Signature>,
}

/// OEM identification of the root table, checked against the FADT.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct OemIds {
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
}

/// One validation run over a table graph.
pub struct Session<'a> {
    memory: &'a dyn PhysMapRo,
    report: Report<'a>,
    files: Option<&'a mut dyn FileSink>,
    options: ReportOptions,
    registry: ParserRegistry,
    counts: BTreeMap<Signature, u32>,
    ancestry: Vec<u64>,
    listed: u32,
    selected_found: bool,
    dump_error: Option<AcpiViewError>,
    root_oem: Option<OemIds>,
}

impl<'a> Session<'a> {
    pub fn new(
        memory: &'a dyn PhysMapRo,
        sink: &'a mut dyn ReportSink,
        options: ReportOptions,
    ) -> Self {
        let report = Report::new(sink)
            .with_highlight(options.highlight)
            .with_consistency_checks(options.consistency_checks)
            .with_profile(options.profile);
        Self {
            memory,
            report,
            files: None,
            options,
            registry: ParserRegistry::default(),
            counts: BTreeMap::new(),
            ancestry: Vec::new(),
            listed: 0,
            selected_found: false,
            dump_error: None,
            root_oem: None,
        }
    }

    /// Replace the built-in parser registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Provide a file system for [`ReportMode::DumpBinary`].
    #[must_use]
    pub fn with_file_sink(mut self, files: &'a mut dyn FileSink) -> Self {
        self.files = Some(files);
        self
    }

    #[inline]
    pub const fn report(&mut self) -> &mut Report<'a> {
        &mut self.report
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> &ReportOptions {
        &self.options
    }

    #[inline]
    pub const fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.registry
    }

    #[inline]
    #[must_use]
    pub const fn diagnostics(&self) -> Diagnostics {
        self.report.diagnostics()
    }

    /// Whether the table currently being processed is traced.
    #[inline]
    #[must_use]
    pub const fn tracing(&self) -> bool {
        !self.report.is_muted()
    }

    /// Read the signature of the table at `address` without processing it.
    #[must_use]
    pub fn signature_at(&self, address: u64) -> Option<Signature> {
        let head = self.memory.map_ro(address, 4).ok()?;
        if head.starts_with(b"RSD ") {
            return Some(Signature::RSDP);
        }
        Signature::from_slice(head)
    }

    /// How many tables with `signature` have been processed in this run.
    #[must_use]
    pub fn instances(&self, signature: Signature) -> u32 {
        self.counts.get(&signature).copied().unwrap_or(0)
    }

    /// Walk the table graph rooted at the RSDP at `rsdp_address`.
    ///
    /// # Errors
    /// Fails if the RSDP cannot be read or references no XSDT, if a table
    /// selected in the [`ReportMode`] was not found, or if a binary dump
    /// could not be written. Validation findings are never errors; they are
    /// returned in the [`Summary`].
    pub fn run(&mut self, rsdp_address: u64) -> Result<Summary, AcpiViewError> {
        self.reset();
        log::debug!("Locating RSDP at 0x{rsdp_address:x}");
        let memory = self.memory;
        let bytes = rsdp::map(memory, rsdp_address)?;

        self.ancestry.push(rsdp_address);
        self.process_mapped(rsdp_address, Signature::RSDP, bytes);
        self.ancestry.pop();

        if rsdp::xsdt_address(bytes).is_none_or(|address| address == 0) {
            return Err(AcpiViewError::XsdtNotFound);
        }
        self.finish()
    }

    /// Process a single table supplied as a buffer, e.g. read from a file.
    /// Tables it references are still looked up through the memory reader.
    ///
    /// # Errors
    /// As [`run`](Self::run), except that no RSDP is required.
    pub fn process_table_bytes(&mut self, bytes: &[u8]) -> Result<Summary, AcpiViewError> {
        self.reset();
        let (signature, declared) = if bytes.starts_with(rsdp::RSDP_SIGNATURE) {
            (Signature::RSDP, rsdp::length(bytes))
        } else {
            let signature = Signature::from_slice(bytes).ok_or(AcpiViewError::TruncatedTable)?;
            (signature, le_u32(bytes, 4).and_then(|l| usize::try_from(l).ok()))
        };
        let bytes = declared
            .and_then(|length| bytes.get(..length))
            .unwrap_or(bytes);
        self.process_mapped(0, signature, bytes);
        self.finish()
    }

    /// Map, count, report and parse the table at `address`.
    ///
    /// Failures are reported inline; the caller's walk always continues.
    pub fn process_table(&mut self, address: u64) {
        if self.ancestry.contains(&address) {
            log::warn!("Reference cycle through table at 0x{address:x}");
            report_error!(
                self.report,
                "Table at 0x{address:X} is already being processed. Circular table reference not \
                followed."
            );
            return;
        }
        if self.ancestry.len() >= self.options.max_depth {
            log::warn!("Table nesting limit of {} reached", self.options.max_depth);
            report_error!(
                self.report,
                "Table at 0x{address:X} exceeds the maximum table nesting depth of {}.",
                self.options.max_depth
            );
            return;
        }

        let memory = self.memory;
        let (signature, bytes) = match map_table(memory, address) {
            Ok(mapped) => mapped,
            Err(e) => {
                report_error!(self.report, "Failed to read table at 0x{address:X}: {e}");
                return;
            }
        };

        self.ancestry.push(address);
        self.process_mapped(address, signature, bytes);
        self.ancestry.pop();
    }

    fn process_mapped(&mut self, address: u64, signature: Signature, bytes: &[u8]) {
        let count = self.counts.entry(signature).or_insert(0);
        *count = count.saturating_add(1);
        let instance = *count;

        let mode = self.options.mode;
        if mode.selected() == Some(signature) {
            self.selected_found = true;
        }
        let trace = match mode {
            ReportMode::All => true,
            ReportMode::Selected(selected) => selected == signature,
            ReportMode::List | ReportMode::DumpBinary(_) => false,
        };

        let was_muted = self.report.set_muted(false);
        match mode {
            ReportMode::List => {
                self.listed += 1;
                report!(self.report, "\t{:4}. {signature}\n", self.listed);
            }
            ReportMode::DumpBinary(selected) if selected == signature => {
                self.dump_binary(signature, instance, bytes);
            }
            _ => {}
        }
        self.report.set_muted(!trace);

        log::debug!(
            "Processing {signature} at 0x{address:x} ({} bytes, {})",
            bytes.len(),
            if trace { "traced" } else { "silent" }
        );

        if trace {
            self.report.banner(format_args!("{signature} Table"));
            if self.options.raw_dump {
                dump_raw(&mut self.report, address, bytes);
            }
            if signature == Signature::RSDP {
                rsdp::verify_checksums(&mut self.report, bytes);
            } else if signature != Signature::FACS {
                self.report.verify_checksum(bytes);
            }
        }

        let table = Table {
            address,
            signature,
            revision: revision_of(signature, bytes),
            bytes,
        };
        match self.registry.lookup(signature) {
            Ok(parser) => parser(self, &table),
            Err(_) => {
                log::debug!("No parser registered for {signature}; dumping the header only");
                dump_header(&mut self.report, bytes);
            }
        }

        self.report.set_muted(was_muted);
    }

    fn dump_binary(&mut self, signature: Signature, instance: u32, bytes: &[u8]) {
        let name = format!("{signature}{instance:04}.bin");
        report!(self.report, "Dumping {signature} table to : {name} ... ");
        let Some(files) = self.files.as_deref_mut() else {
            report_error!(self.report, "No file system available.");
            self.dump_error.get_or_insert(AcpiViewError::NoFileSink);
            return;
        };
        match write_file(files, &name, bytes) {
            Ok(()) => report!(self.report, "DONE.\n"),
            Err(e) => {
                log::warn!("Dumping {signature} to {name} failed: {e}");
                report_error!(self.report, "{e}");
                self.dump_error.get_or_insert(AcpiViewError::Dump(e));
            }
        }
    }

    fn reset(&mut self) {
        self.report.reset_diagnostics();
        self.report.set_muted(false);
        self.counts.clear();
        self.ancestry.clear();
        self.listed = 0;
        self.selected_found = false;
        self.dump_error = None;
        self.root_oem = None;
        if self.options.mode == ReportMode::List {
            report!(self.report, "\nInstalled Table(s):\n");
        }
    }

    fn finish(&mut self) -> Result<Summary, AcpiViewError> {
        self.report.set_muted(false);
        let mut missing_mandatory = Vec::new();
        if let Some(version) = self.options.mandatory_tables
            && let Err(sbbr::SbbrError::MandatoryTablesMissing(missing)) =
                sbbr::validate(version, &self.counts, &mut self.report)
        {
            missing_mandatory = missing;
        }

        if let Some(signature) = self.options.mode.selected()
            && !self.selected_found
        {
            report!(self.report, "\nRequested ACPI Table not found.\n");
            return Err(AcpiViewError::TableNotFound(signature));
        }

        if matches!(self.options.mode, ReportMode::All | ReportMode::Selected(_))
            && self.options.consistency_checks
        {
            self.report.statistics();
        }

        if let Some(e) = self.dump_error.take() {
            return Err(e);
        }

        Ok(Summary {
            diagnostics: self.report.diagnostics(),
            tables: self.counts.values().copied().fold(0, u32::saturating_add),
            missing_mandatory,
        })
    }

    pub(crate) fn set_root_oem(&mut self, header: &AcpiHeader) {
        self.root_oem = Some(OemIds {
            oem_id: header.oem_id,
            oem_table_id: header.oem_table_id,
        });
    }

    pub(crate) const fn root_oem(&self) -> Option<OemIds> {
        self.root_oem
    }
}

fn map_table(memory: &dyn PhysMapRo, address: u64) -> Result<(Signature, &[u8]), AcpiViewError> {
    let head = memory.map_ro(address, 8)?;
    let (Some(signature), Some(length)) = (Signature::from_slice(head), le_u32(head, 4)) else {
        return Err(AcpiViewError::TruncatedTable);
    };
    let minimum = if signature == Signature::FACS {
        8
    } else {
        ACPI_HEADER_LENGTH
    };
    let invalid = AcpiViewError::InvalidLength {
        address,
        signature,
        length,
    };
    let len = usize::try_from(length).map_err(|_| invalid.clone())?;
    if len < minimum {
        return Err(invalid);
    }
    Ok((signature, memory.map_ro(address, len)?))
}

fn write_file(files: &mut dyn FileSink, name: &str, bytes: &[u8]) -> Result<(), FileSinkError> {
    let handle = files.create_file(name)?;
    match files.write(handle, bytes) {
        Ok(written) if written == bytes.len() => Ok(()),
        Ok(_) => {
            files.delete_file(handle)?;
            Err(FileSinkError::Write)
        }
        Err(e) => {
            files.delete_file(handle)?;
            Err(e)
        }
    }
}

fn revision_of(signature: Signature, bytes: &[u8]) -> u8 {
    let offset = match signature {
        Signature::RSDP => 15,
        Signature::FACS => 32,
        _ => 8,
    };
    bytes.get(offset).copied().unwrap_or(0)
}
