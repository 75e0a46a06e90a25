//! # Diagnostics counters

/// Error and warning counts accumulated over one run.
///
/// Counters only ever grow; they are owned by a [`Report`](crate::Report)
/// and read once at the end of the run to print the summary.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    errors: u32,
    warnings: u32,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            errors: 0,
            warnings: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn errors(&self) -> u32 {
        self.errors
    }

    #[inline]
    #[must_use]
    pub const fn warnings(&self) -> u32 {
        self.warnings
    }

    /// Whether anything at all was flagged.
    #[inline]
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }

    pub(crate) const fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
    }

    pub(crate) const fn record_warning(&mut self) {
        self.warnings = self.warnings.saturating_add(1);
    }
}
