//! # acpiview
//!
//! Walks the ACPI tables of a memory image starting from the RSDP, or a
//! single table read from a file, and prints every field with the findings
//! of the validators.
//!
//! ```text
//! acpiview --region 0xE0000=rsdp.bin --region 0x7FF00000=tables.bin --rsdp 0xE0000
//! acpiview --table APIC.bin --arm -h
//! ```
//!
//! Exit status is 0 whenever the walk completes, however many errors and
//! warnings it reported. Discovery and I/O failures exit with 1, invalid
//! usage with 2 and a requested table that was not found with 3.

mod console;
mod files;
mod logger;

use acpi_view::options::DEFAULT_MAX_DEPTH;
use acpi_view::{
    AcpiViewError, ArchProfile, PhysRegions, ReportMode, ReportOptions, SbbrVersion, Session,
    Signature, Summary,
};
use clap::{ArgAction, ArgGroup, Parser};
use console::Console;
use files::DirectoryFiles;
use logger::StderrLogger;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("an RSDP address is required unless --table is given")]
    NoRsdp,
    #[error(transparent)]
    Run(#[from] AcpiViewError),
}

/// A memory image to place in the physical address space.
#[derive(Debug, Clone)]
struct Region {
    base: u64,
    path: PathBuf,
}

#[derive(Parser, Debug)]
#[command(version, about = "Display and validate ACPI tables", disable_help_flag = true)]
#[command(group(ArgGroup::new("mode").args(["select", "list", "dump"])))]
struct Options {
    /// Physical address of the RSDP
    #[arg(long, value_parser = parse_address)]
    rsdp: Option<u64>,

    /// Load FILE at physical address ADDR
    #[arg(long = "region", value_name = "ADDR=FILE", value_parser = parse_region)]
    regions: Vec<Region>,

    /// Trace a single table read from FILE
    #[arg(long, value_name = "FILE", conflicts_with = "rsdp")]
    table: Option<PathBuf>,

    /// Trace only tables with this signature
    #[arg(short, long, value_name = "SIG", value_parser = parse_signature)]
    select: Option<Signature>,

    /// List the installed tables
    #[arg(short, long)]
    list: bool,

    /// Dump tables with this signature to binary files
    #[arg(short, long, value_name = "SIG", value_parser = parse_signature)]
    dump: Option<Signature>,

    /// Directory for binary dumps
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Skip consistency checks
    #[arg(short, long)]
    quiet: bool,

    /// Colour-highlight the output
    #[arg(short = 'h', long)]
    highlight: bool,

    /// Check the mandatory tables of an SBBR version (1.0, 1.1 or 1.2)
    #[arg(short = 'r', long, value_name = "VERSION", value_parser = parse_sbbr)]
    sbbr: Option<SbbrVersion>,

    /// Apply the Arm platform rules
    #[arg(long)]
    arm: bool,

    /// Do not hex-dump tables before their fields
    #[arg(long)]
    no_raw: bool,

    /// Maximum depth of nested table references
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log more; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,
}

impl Options {
    fn mode(&self) -> ReportMode {
        if let Some(signature) = self.dump {
            ReportMode::DumpBinary(signature)
        } else if let Some(signature) = self.select {
            ReportMode::Selected(signature)
        } else if self.list {
            ReportMode::List
        } else {
            ReportMode::All
        }
    }

    fn report_options(&self) -> ReportOptions {
        let profile = if self.arm || self.sbbr.is_some() {
            ArchProfile::Arm
        } else {
            ArchProfile::Generic
        };
        ReportOptions::default()
            .with_mode(self.mode())
            .with_highlight(self.highlight)
            .with_consistency_checks(!self.quiet)
            .with_raw_dump(!self.no_raw)
            .with_mandatory_tables(self.sbbr)
            .with_profile(profile)
            .with_max_depth(self.max_depth)
    }
}

fn parse_address(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{text}`: {e}"))
}

fn parse_region(text: &str) -> Result<Region, String> {
    let (base, path) = text
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=FILE, got `{text}`"))?;
    if path.is_empty() {
        return Err(format!("missing file name in `{text}`"));
    }
    Ok(Region {
        base: parse_address(base)?,
        path: PathBuf::from(path),
    })
}

fn parse_signature(text: &str) -> Result<Signature, String> {
    Signature::parse(text)
        .ok_or_else(|| format!("`{text}` is not a four-character table signature"))
}

fn parse_sbbr(text: &str) -> Result<SbbrVersion, String> {
    SbbrVersion::parse(text)
        .ok_or_else(|| format!("unknown SBBR version `{text}`, expected 1.0, 1.1 or 1.2"))
}

fn read(path: &Path) -> Result<Vec<u8>, ToolError> {
    std::fs::read(path).map_err(|source| ToolError::Read {
        path: path.to_owned(),
        source,
    })
}

fn load_regions(regions: &[Region]) -> Result<PhysRegions, ToolError> {
    let mut memory = PhysRegions::new();
    for region in regions {
        let bytes = read(&region.path)?;
        log::info!(
            "Loaded {} bytes at 0x{:x} from {}",
            bytes.len(),
            region.base,
            region.path.display()
        );
        memory.insert(region.base, bytes);
    }
    Ok(memory)
}

fn run(options: &Options, console: &mut Console) -> Result<Summary, ToolError> {
    let report_options = options.report_options();
    let mut files = DirectoryFiles::new(&options.out_dir);

    if let Some(path) = &options.table {
        let bytes = read(path)?;
        let memory = PhysRegions::new();
        let mut session = Session::new(&memory, console, report_options).with_file_sink(&mut files);
        return Ok(session.process_table_bytes(&bytes)?);
    }

    let rsdp = options.rsdp.ok_or(ToolError::NoRsdp)?;
    let memory = load_regions(&options.regions)?;
    let mut session = Session::new(&memory, console, report_options).with_file_sink(&mut files);
    Ok(session.run(rsdp)?)
}

/// The walk completed; findings are reported, not signalled.
const EXIT_COMPLETED: u8 = 0;
/// RSDP or XSDT not found, unreadable memory or input, failed dump.
const EXIT_FAILED: u8 = 1;
/// Invalid command line; the same code clap uses for usage errors.
const EXIT_USAGE: u8 = 2;
/// The table selected with `-s` or `-d` is not installed.
const EXIT_TABLE_NOT_FOUND: u8 = 3;

const fn exit_code(result: &Result<Summary, ToolError>) -> u8 {
    match result {
        Ok(_) => EXIT_COMPLETED,
        Err(ToolError::NoRsdp) => EXIT_USAGE,
        Err(ToolError::Run(AcpiViewError::TableNotFound(_))) => EXIT_TABLE_NOT_FOUND,
        Err(_) => EXIT_FAILED,
    }
}

fn main() -> ExitCode {
    let options = Options::parse();

    let colour = options.highlight && std::io::stderr().is_terminal();
    if let Err(e) = StderrLogger::new(StderrLogger::level_for(options.verbose), colour).init() {
        eprintln!("acpiview: logger not installed: {e}");
    }

    let mut console = Console::stdout();
    let result = run(&options, &mut console);
    if let Err(e) = console.flush() {
        log::warn!("Failed to flush the report: {e}");
    }

    match &result {
        Ok(summary) => log::info!(
            "{} table(s), {} error(s), {} warning(s)",
            summary.tables,
            summary.diagnostics.errors(),
            summary.diagnostics.warnings()
        ),
        Err(e) => eprintln!("acpiview: {e}"),
    }
    ExitCode::from(exit_code(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Options::command().debug_assert();
    }

    #[test]
    fn addresses_accept_hex_and_decimal() {
        assert_eq!(parse_address("0xE0000"), Ok(0xE0000));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn regions_split_on_the_first_equals_sign() {
        let region = parse_region("0x1000=dir/a=b.bin").unwrap();
        assert_eq!(region.base, 0x1000);
        assert_eq!(region.path, PathBuf::from("dir/a=b.bin"));
        assert!(parse_region("0x1000").is_err());
        assert!(parse_region("0x1000=").is_err());
    }

    #[test]
    fn flags_select_the_mode() {
        let options = Options::parse_from(["acpiview", "--rsdp", "0xE0000", "-s", "apic", "-q"]);
        let report = options.report_options();
        assert_eq!(report.mode, ReportMode::Selected(Signature::MADT));
        assert!(!report.consistency_checks);
        assert_eq!(report.profile, ArchProfile::Generic);

        let options = Options::parse_from(["acpiview", "--rsdp", "0", "-l", "-r", "1.1"]);
        let report = options.report_options();
        assert_eq!(report.mode, ReportMode::List);
        assert_eq!(report.mandatory_tables, Some(SbbrVersion::V1_1));
        assert_eq!(report.profile, ArchProfile::Arm);
    }

    #[test]
    fn findings_do_not_change_the_exit_code() {
        let mut missing = Summary {
            diagnostics: acpi_view::Diagnostics::new(),
            tables: 5,
            missing_mandatory: vec![Signature::GTDT],
        };
        assert_eq!(exit_code(&Ok(missing.clone())), EXIT_COMPLETED);
        missing.missing_mandatory.clear();
        assert_eq!(exit_code(&Ok(missing)), EXIT_COMPLETED);
    }

    #[test]
    fn failures_map_to_distinct_codes() {
        let not_found = Err(ToolError::Run(AcpiViewError::TableNotFound(Signature::MADT)));
        let no_rsdp = Err(ToolError::Run(AcpiViewError::RsdpNotFound(0xE0000)));
        let no_xsdt = Err(ToolError::Run(AcpiViewError::XsdtNotFound));
        assert_eq!(exit_code(&not_found), EXIT_TABLE_NOT_FOUND);
        assert_eq!(exit_code(&no_rsdp), EXIT_FAILED);
        assert_eq!(exit_code(&no_xsdt), EXIT_FAILED);
        assert_eq!(exit_code(&Err(ToolError::NoRsdp)), EXIT_USAGE);

        let codes = [EXIT_COMPLETED, EXIT_FAILED, EXIT_USAGE, EXIT_TABLE_NOT_FOUND];
        for (i, a) in codes.iter().enumerate() {
            assert!(codes[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(Options::try_parse_from(["acpiview", "-l", "-d", "FACP"]).is_err());
        assert!(Options::try_parse_from(["acpiview", "--table", "a.bin", "--rsdp", "0"]).is_err());
        assert!(Options::try_parse_from(["acpiview", "-s", "TOOLONG"]).is_err());
    }
}
