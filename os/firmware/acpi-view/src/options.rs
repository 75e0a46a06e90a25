//! # Report options
//!
//! Everything the front end decides before a run starts: which tables are
//! reported and how, which optional checks run, and which platform rules
//! apply. A [`Session`](crate::Session) takes ownership of one
//! [`ReportOptions`] and never changes it.

use crate::Signature;
use core::fmt;

/// What a run produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Trace every table that is discovered.
    #[default]
    All,
    /// Trace only tables with the given signature.
    Selected(Signature),
    /// Print the signature of every discovered table, no field trace.
    List,
    /// Write the raw bytes of tables with the given signature to files.
    DumpBinary(Signature),
}

impl ReportMode {
    /// The signature the mode is restricted to, if any.
    #[must_use]
    pub const fn selected(self) -> Option<Signature> {
        match self {
            Self::Selected(s) | Self::DumpBinary(s) => Some(s),
            Self::All | Self::List => None,
        }
    }
}

/// Architecture profile selecting platform-specific validation rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ArchProfile {
    /// Rules that hold on every platform.
    #[default]
    Generic,
    /// Additional rules for Arm (SBSA/SBBR) platforms.
    Arm,
}

/// Server Base Boot Requirements specification version.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SbbrVersion {
    V1_0,
    V1_1,
    V1_2,
}

impl SbbrVersion {
    /// Parse `"1.0"`, `"1.1"` or `"1.2"`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "1.0" => Some(Self::V1_0),
            "1.1" => Some(Self::V1_1),
            "1.2" => Some(Self::V1_2),
            _ => None,
        }
    }
}

impl fmt::Display for SbbrVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
            Self::V1_2 => "1.2",
        })
    }
}

/// Default bound on nested table references (RSDP → XSDT → FADT → DSDT is 4).
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Options for one run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub mode: ReportMode,
    /// Colour-highlight section headers and diagnostics.
    pub highlight: bool,
    /// Run field validators and schema consistency checks.
    pub consistency_checks: bool,
    /// Hex-dump each traced table before its fields.
    pub raw_dump: bool,
    /// Validate mandatory table presence against this SBBR version.
    pub mandatory_tables: Option<SbbrVersion>,
    pub profile: ArchProfile,
    pub max_depth: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            mode: ReportMode::All,
            highlight: false,
            consistency_checks: true,
            raw_dump: true,
            mandatory_tables: None,
            profile: ArchProfile::Generic,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReportOptions {
    #[must_use]
    pub const fn with_mode(mut self, mode: ReportMode) -> Self {
        self.mode = mode;
        self
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
    pub const fn with_raw_dump(mut self, enabled: bool) -> Self {
        self.raw_dump = enabled;
        self
    }

    #[must_use]
    pub const fn with_mandatory_tables(mut self, version: Option<SbbrVersion>) -> Self {
        self.mandatory_tables = version;
        self
    }

    #[must_use]
    pub const fn with_profile(mut self, profile: ArchProfile) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
