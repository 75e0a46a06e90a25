mod common;

use acpi_view::{
    AcpiViewError, ArchProfile, FileSinkError, ParserRegistry, PhysRegions, RegistryError,
    ReportMode, ReportOptions, SbbrVersion, Session, Signature, Summary, Table,
};
use common::*;

fn run(memory: &PhysRegions, options: ReportOptions) -> (Result<Summary, AcpiViewError>, String) {
    let mut out = String::new();
    let result = {
        let mut session = Session::new(memory, &mut out, options);
        session.run(RSDP_ADDRESS)
    };
    (result, out)
}

#[test]
fn well_formed_graph_is_walked_without_diagnostics() {
    let memory = platform();
    let (result, out) = run(&memory, ReportOptions::default());
    let summary = result.unwrap();

    assert_eq!(summary.diagnostics.errors(), 0, "{out}");
    assert_eq!(summary.diagnostics.warnings(), 0, "{out}");
    // RSDP, XSDT, FACP, FACS, DSDT, OEMX
    assert_eq!(summary.tables, 6);
    for banner in ["XSDT Table", "FACP Table", "FACS Table", "DSDT Table", "OEMX Table"] {
        assert!(out.contains(banner), "missing {banner}");
    }
    assert!(out.contains("Table Statistics"));
}

#[test]
fn fadt_oem_mismatch_is_a_warning() {
    let mut memory = platform();
    let mut fadt = fadt(FACS_ADDRESS, DSDT_ADDRESS, 0);
    fadt[16..24].copy_from_slice(b"OTHERTBL");
    fix_checksum(&mut fadt, 9);
    memory.insert(FADT_ADDRESS, fadt);

    let (result, _) = run(&memory, ReportOptions::default());
    let summary = result.unwrap();
    assert_eq!(summary.diagnostics.errors(), 0);
    assert_eq!(summary.diagnostics.warnings(), 1);
}

#[test]
fn bad_checksum_is_one_error() {
    let mut memory = platform();
    let mut dsdt = dsdt();
    dsdt[40] ^= 0xFF;
    memory.insert(DSDT_ADDRESS, dsdt);

    let (result, _) = run(&memory, ReportOptions::default());
    assert_eq!(result.unwrap().diagnostics.errors(), 1);
}

#[test]
fn list_mode_prints_every_table_once() {
    let memory = platform();
    let (result, out) = run(&memory, ReportOptions::default().with_mode(ReportMode::List));
    assert!(result.is_ok());
    assert!(out.contains("Installed Table(s):"));
    assert!(out.contains("6. OEMX"), "{out}");
    assert!(!out.contains("FACP Table"));
}

#[test]
fn selected_mode_traces_only_the_selected_table() {
    let memory = platform();
    let options = ReportOptions::default().with_mode(ReportMode::Selected(Signature::FACS));
    let (result, out) = run(&memory, options);
    assert!(result.is_ok());
    assert!(out.contains("FACS Table"));
    assert!(!out.contains("FACP Table"));
    assert!(!out.contains("XSDT Table"));
}

#[test]
fn selected_table_must_exist() {
    let memory = platform();
    let options = ReportOptions::default().with_mode(ReportMode::Selected(Signature::MADT));
    let (result, out) = run(&memory, options);
    assert_eq!(result.unwrap_err(), AcpiViewError::TableNotFound(Signature::MADT));
    assert!(out.contains("Requested ACPI Table not found."));
}

#[test]
fn selected_tables_are_dumped_to_files() {
    let memory = platform();
    let mut files = MemoryFiles::default();
    let mut out = String::new();
    let result = {
        let options = ReportOptions::default().with_mode(ReportMode::DumpBinary(Signature::DSDT));
        let mut session = Session::new(&memory, &mut out, options).with_file_sink(&mut files);
        session.run(RSDP_ADDRESS)
    };
    assert!(result.is_ok());
    assert_eq!(files.files.get("DSDT0001.bin"), Some(&dsdt()));
    assert!(out.contains("DONE."));
}

#[test]
fn short_writes_delete_the_partial_file() {
    let memory = platform();
    let mut files = MemoryFiles::truncating(10);
    let mut out = String::new();
    let result = {
        let options = ReportOptions::default().with_mode(ReportMode::DumpBinary(Signature::DSDT));
        let mut session = Session::new(&memory, &mut out, options).with_file_sink(&mut files);
        session.run(RSDP_ADDRESS)
    };
    assert_eq!(result.unwrap_err(), AcpiViewError::Dump(FileSinkError::Write));
    assert!(files.files.is_empty());
}

#[test]
fn dumping_needs_a_file_sink() {
    let memory = platform();
    let options = ReportOptions::default().with_mode(ReportMode::DumpBinary(Signature::FADT));
    let (result, _) = run(&memory, options);
    assert_eq!(result.unwrap_err(), AcpiViewError::NoFileSink);
}

#[test]
fn circular_references_are_reported_once() {
    let mut memory = platform();
    memory.insert(XSDT_ADDRESS, xsdt(&[FADT_ADDRESS, XSDT_ADDRESS]));
    let (result, _) = run(&memory, ReportOptions::default());
    assert_eq!(result.unwrap().diagnostics.errors(), 1);
}

#[test]
fn nesting_depth_is_capped() {
    let memory = platform();
    let (result, _) = run(&memory, ReportOptions::default().with_max_depth(2));
    // FACP and OEMX sit at depth 3.
    assert_eq!(result.unwrap().diagnostics.errors(), 2);
}

#[test]
fn unreadable_entries_do_not_stop_the_walk() {
    let mut memory = platform();
    memory.insert(XSDT_ADDRESS, xsdt(&[0x9000_0000, FADT_ADDRESS]));
    let (result, out) = run(&memory, ReportOptions::default());
    let summary = result.unwrap();
    assert_eq!(summary.diagnostics.errors(), 1);
    assert!(out.contains("DSDT Table"));
}

#[test]
fn missing_rsdp_fails_the_run() {
    let memory = PhysRegions::new();
    let (result, _) = run(&memory, ReportOptions::default());
    assert!(result.is_err());
}

#[test]
fn arm_profile_applies_fadt_rules() {
    let memory = platform();
    let (result, _) = run(&memory, ReportOptions::default().with_profile(ArchProfile::Arm));
    // X_FIRMWARE_CTRL must be zero and HW_REDUCED_ACPI must be set.
    assert_eq!(result.unwrap().diagnostics.errors(), 2);
}

#[test]
fn arm_hw_reduced_platform_without_facs_is_clean() {
    let mut memory = platform();
    memory.insert(FADT_ADDRESS, fadt(0, DSDT_ADDRESS, 1 << 20));
    let (result, out) = run(&memory, ReportOptions::default().with_profile(ArchProfile::Arm));
    let summary = result.unwrap();
    assert_eq!(summary.diagnostics.errors(), 0, "{out}");
    assert_eq!(summary.tables, 5);
}

#[test]
fn missing_sbbr_tables_are_listed() {
    let memory = platform();
    let options = ReportOptions::default().with_mandatory_tables(Some(SbbrVersion::V1_0));
    let (result, out) = run(&memory, options);
    let summary = result.unwrap();
    assert_eq!(
        summary.missing_mandatory,
        vec![Signature::MADT, Signature::GTDT, Signature::DBG2, Signature::SPCR]
    );
    assert_eq!(summary.diagnostics.errors(), 4);
    assert!(!out.contains("FACP table is mandatory"));
}

fn first(session: &mut Session<'_>, _: &Table<'_>) {
    session.report().print(format_args!("first parser\n"));
}

fn second(session: &mut Session<'_>, _: &Table<'_>) {
    session.report().print(format_args!("second parser\n"));
}

#[test]
fn duplicate_registration_keeps_the_original_parser() {
    let oemx = Signature::new(*b"OEMX");
    let mut registry = ParserRegistry::default();
    registry.register(oemx, first).unwrap();
    assert_eq!(registry.register(oemx, second), Err(RegistryError::AlreadyRegistered(oemx)));

    let memory = platform();
    let mut out = String::new();
    {
        let mut session =
            Session::new(&memory, &mut out, ReportOptions::default()).with_registry(registry);
        session.run(RSDP_ADDRESS).unwrap();
    }
    assert!(out.contains("first parser"));
    assert!(!out.contains("second parser"));
}
