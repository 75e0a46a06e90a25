//! # Report output
//!
//! The engine never talks to a console directly. All human-readable output
//! goes through a [`ReportSink`], and the optional binary table dump goes
//! through a [`FileSink`]; both are provided by the host.

use crate::options::ArchProfile;
use crate::{Diagnostics, checksum_ok, sum};
use alloc::string::String;
use core::fmt::{self, Write};

/// Width of the field-name column in traced output.
pub const OUTPUT_FIELD_COLUMN_WIDTH: usize = 36;

/// Colour category for highlighted output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Highlight {
    Info,
    Good,
    Warn,
    Error,
    Section,
}

/// Destination for trace output.
///
/// `write_str` emits text; [`set_highlight`](Self::set_highlight) selects the
/// colour for subsequent text, `None` restoring the default.
pub trait ReportSink: Write {
    fn set_highlight(&mut self, highlight: Option<Highlight>);
}

/// Plain buffer; highlighting is dropped.
impl ReportSink for String {
    fn set_highlight(&mut self, _highlight: Option<Highlight>) {}
}

/// Opaque handle to a file created by a [`FileSink`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileHandle(pub usize);

/// A file operation of a [`FileSink`] failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileSinkError {
    #[error("failed to create {0}")]
    Create(String),
    #[error("failed to write file")]
    Write,
    #[error("failed to delete file")]
    Delete,
}

/// Host file system used to dump tables as binary files.
pub trait FileSink {
    /// # Errors
    /// Returns [`FileSinkError::Create`] if the file cannot be created.
    fn create_file(&mut self, name: &str) -> Result<FileHandle, FileSinkError>;

    /// Write `bytes` and return how many were written.
    ///
    /// # Errors
    /// Returns [`FileSinkError::Write`] on I/O failure.
    fn write(&mut self, handle: FileHandle, bytes: &[u8]) -> Result<usize, FileSinkError>;

    /// # Errors
    /// Returns [`FileSinkError::Delete`] if the file cannot be removed.
    fn delete_file(&mut self, handle: FileHandle) -> Result<(), FileSinkError>;
}

/// Trace output plus the diagnostics context of one run.
///
/// Table parsers and validators receive a `&mut Report`; printing a
/// diagnostic through it is the only way to record one.
pub struct Report<'s> {
    sink: &'s mut dyn ReportSink,
    diagnostics: Diagnostics,
    indent: usize,
    at_line_start: bool,
    highlight: bool,
    muted: bool,
    consistency_checks: bool,
    profile: ArchProfile,
}

impl<'s> Report<'s> {
    pub fn new(sink: &'s mut dyn ReportSink) -> Self {
        Self {
            sink,
            diagnostics: Diagnostics::new(),
            indent: 0,
            at_line_start: true,
            highlight: false,
            muted: false,
            consistency_checks: true,
            profile: ArchProfile::Generic,
        }
    }

    #[must_use]
    pub const fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    #[must_use]
    pub const fn with_consistency_checks(mut self, enabled: bool) -> Self {
        self.consistency_checks = enabled;
        self
    }

    #[must_use]
    pub const fn with_profile(mut self, profile: ArchProfile) -> Self {
        self.profile = profile;
        self
    }

    #[inline]
    #[must_use]
    pub const fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    #[inline]
    #[must_use]
    pub const fn consistency_checks(&self) -> bool {
        self.consistency_checks
    }

    #[inline]
    #[must_use]
    pub const fn highlight(&self) -> bool {
        self.highlight
    }

    #[inline]
    #[must_use]
    pub const fn profile(&self) -> ArchProfile {
        self.profile
    }

    #[inline]
    #[must_use]
    pub const fn indent(&self) -> usize {
        self.indent
    }

    /// Whether output is currently suppressed. Tables that are walked only
    /// to reach the tables they reference are processed muted.
    #[inline]
    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    /// Suppress or resume output; returns the previous state. Diagnostics
    /// raised while muted are not counted.
    pub(crate) const fn set_muted(&mut self, muted: bool) -> bool {
        let previous = self.muted;
        self.muted = muted;
        previous
    }

    pub(crate) const fn reset_diagnostics(&mut self) {
        self.diagnostics = Diagnostics::new();
    }

    /// Print formatted text. Output errors are ignored; this is best-effort.
    pub fn print(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.write_fmt(args);
    }

    /// Terminate the current line unless it is empty.
    pub fn end_line(&mut self) {
        if !self.at_line_start {
            self.emit("\n");
        }
    }

    /// Print a left-aligned field name followed by `" : "`.
    pub fn field_name(&mut self, extra_indent: usize, name: &str) {
        let indent = self.indent + extra_indent;
        let width = OUTPUT_FIELD_COLUMN_WIDTH.saturating_sub(indent);
        report!(self, "{:indent$}{name:<width$} : ", "");
    }

    /// Print a record title line, e.g. `"  GICC                    :"`.
    pub fn title(&mut self, name: &str) {
        let indent = self.indent;
        let width = OUTPUT_FIELD_COLUMN_WIDTH.saturating_sub(indent);
        self.end_line();
        self.colour(Some(Highlight::Section));
        report!(self, "{:indent$}{name:<width$} :\n", "");
        self.colour(None);
    }

    /// Print a banner such as `" --------------- APIC Table --------------- "`.
    pub fn banner(&mut self, text: fmt::Arguments<'_>) {
        self.end_line();
        self.colour(Some(Highlight::Section));
        report!(self, " --------------- {text} --------------- \n\n");
        self.colour(None);
    }

    pub fn error(&mut self, args: fmt::Arguments<'_>) {
        if !self.muted {
            self.diagnostics.record_error();
        }
        self.labelled(Highlight::Error, "ERROR", args);
    }

    pub fn warning(&mut self, args: fmt::Arguments<'_>) {
        if !self.muted {
            self.diagnostics.record_warning();
        }
        self.labelled(Highlight::Warn, "WARNING", args);
    }

    /// Informational note; not counted.
    pub fn info(&mut self, args: fmt::Arguments<'_>) {
        self.labelled(Highlight::Info, "INFO", args);
    }

    /// Print the table checksum verdict and count a failure as an error.
    pub fn verify_checksum(&mut self, bytes: &[u8]) -> bool {
        self.verify_checksum_as("Table Checksum", bytes)
    }

    /// [`verify_checksum`](Self::verify_checksum) with a custom label, for
    /// structures with more than one checksum.
    pub fn verify_checksum_as(&mut self, label: &str, bytes: &[u8]) -> bool {
        let ok = checksum_ok(bytes);
        self.end_line();
        if ok {
            self.colour(Some(Highlight::Good));
            report!(self, "{label} : OK\n\n");
        } else {
            if !self.muted {
                self.diagnostics.record_error();
            }
            self.colour(Some(Highlight::Error));
            report!(self, "{label} : FAILED (0x{:X})\n\n", sum(bytes));
        }
        self.colour(None);
        ok
    }

    /// Print the end-of-run statistics.
    pub fn statistics(&mut self) {
        let d = self.diagnostics;
        self.end_line();
        self.colour(Some(Highlight::Section));
        report!(self, "\nTable Statistics:\n");
        self.colour((d.errors() > 0).then_some(Highlight::Error));
        report!(self, "\t{} Error(s)\n", d.errors());
        self.colour((d.warnings() > 0).then_some(Highlight::Warn));
        report!(self, "\t{} Warning(s)\n", d.warnings());
        self.colour(None);
    }

    /// Run `f` with the indentation increased by `by` columns.
    pub fn indented<R>(&mut self, by: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.indent += by;
        let r = f(self);
        self.indent -= by;
        r
    }

    pub(crate) fn colour(&mut self, highlight: Option<Highlight>) {
        if self.highlight && !self.muted {
            self.sink.set_highlight(highlight);
        }
    }

    fn labelled(&mut self, category: Highlight, label: &str, args: fmt::Arguments<'_>) {
        self.end_line();
        self.colour(Some(category));
        report!(self, "{label}: ");
        self.colour(None);
        report!(self, "{args}");
        self.end_line();
    }

    fn emit(&mut self, s: &str) {
        if s.is_empty() || self.muted {
            return;
        }
        self.at_line_start = s.ends_with('\n');
        let _ = self.sink.write_str(s);
    }
}

impl Write for Report<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.emit(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_are_counted_and_printed() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        report!(r, "value");
        report_error!(r, "broken {}", 1);
        report_warning!(r, "odd");
        assert_eq!(r.diagnostics().errors(), 1);
        assert_eq!(r.diagnostics().warnings(), 1);
        drop(r);
        assert_eq!(out, "value\nERROR: broken 1\nWARNING: odd\n");
    }

    #[test]
    fn field_names_are_padded_to_the_column() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        r.field_name(2, "Length");
        drop(r);
        assert_eq!(out.len(), 2 + 34 + 3);
        assert!(out.starts_with("  Length "));
        assert!(out.ends_with(" : "));
    }

    #[test]
    fn checksum_failure_counts_as_error() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        assert!(r.verify_checksum(&[0x10, 0xF0]));
        assert!(!r.verify_checksum(&[0x10, 0xF1]));
        assert_eq!(r.diagnostics().errors(), 1);
        drop(r);
        assert!(out.contains("Table Checksum : OK"));
        assert!(out.contains("Table Checksum : FAILED (0x1)"));
    }

    #[test]
    fn muted_reports_neither_print_nor_count() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        assert!(!r.set_muted(true));
        report!(r, "hidden");
        report_error!(r, "hidden");
        r.verify_checksum(&[1]);
        assert!(r.set_muted(false));
        report!(r, "shown");
        assert!(r.diagnostics().is_clean());
        drop(r);
        assert_eq!(out, "shown");
    }
}
