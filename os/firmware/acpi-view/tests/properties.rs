mod common;

use acpi_view::field::schema_len;
use acpi_view::header::HEADER_FIELDS;
use acpi_view::tables::{self, slit::validate_slit};
use acpi_view::walker::{parse, peek};
use acpi_view::{Field, PhysRegions, Render, Report, ReportOptions, Session};

/// Offsets of `schema` are contiguous from zero, recursively.
fn assert_contiguous(name: &str, schema: &[Field]) {
    let mut offset = 0;
    for field in schema {
        assert_eq!(
            field.offset,
            offset,
            "{name}: {} starts at {}, expected {offset}",
            field.name,
            field.offset
        );
        assert!(field.length > 0, "{name}: {} is empty", field.name);
        if let Render::Nested(inner) = field.render {
            assert_eq!(schema_len(inner), field.length, "{name}: nested {} size", field.name);
            assert_contiguous(field.name, inner);
        }
        offset += field.length;
    }
}

#[test]
fn every_shipped_schema_is_contiguous() {
    let all = tables::schemas();
    assert!(all.len() > 100);
    for (name, schema) in all {
        assert_contiguous(name, schema);
    }
}

#[test]
fn parse_accounts_for_exactly_the_schema() {
    for (name, schema) in tables::schemas() {
        let len = schema_len(schema);
        let buffer = vec![0u8; len + 7];
        let mut out = String::new();
        let mut report = Report::new(&mut out);
        let parsed = parse(&mut report, 0, Some(name), &buffer, schema);
        assert_eq!(parsed.consumed(), len, "{name}");
        assert_eq!(parsed.visited(), schema.len(), "{name}");
    }
}

#[test]
fn truncated_buffers_visit_only_whole_fields() {
    for (name, schema) in tables::schemas() {
        let len = schema_len(schema);
        for cut in [0, len / 2, len.saturating_sub(1)] {
            let buffer = vec![0u8; cut];
            let parsed = peek(&buffer, schema);
            let fitting = schema.iter().take_while(|f| f.end() <= cut).count();
            assert_eq!(parsed.visited(), fitting, "{name} cut at {cut}");
            assert!(parsed.consumed() <= cut, "{name} cut at {cut}");
        }
    }
}

#[test]
fn truncated_header_stops_before_oem_table_id() {
    let buffer = [0u8; 20];
    let parsed = peek(&buffer, HEADER_FIELDS);
    assert_eq!(parsed.visited(), 5);
    assert_eq!(parsed.consumed(), 16);
    assert!(parsed.bytes("Oem Table ID").is_none());
}

#[test]
fn checksum_byte_balances_any_buffer() {
    // Small linear congruential generator; the buffers only need variety.
    let mut state = 0x2545_F491u32;
    let mut next = move || {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        state.to_le_bytes()[2]
    };

    for len in [1usize, 2, 9, 36, 64, 257] {
        let mut bytes: Vec<u8> = (0..len).map(|_| next()).collect();
        let at = usize::from(next()) % len;
        common::fix_checksum(&mut bytes, at);

        let mut out = String::new();
        let mut report = Report::new(&mut out);
        assert!(report.verify_checksum(&bytes), "len {len}");

        if len > 1 {
            let other = (at + 1) % len;
            bytes[other] = bytes[other].wrapping_add(1);
            assert!(!report.verify_checksum(&bytes), "len {len}");
        }
        assert_eq!(report.diagnostics().errors(), u32::from(len > 1));
    }
}

#[test]
fn slit_validator_matches_the_examples() {
    let mut out = String::new();
    let mut report = Report::new(&mut out);
    validate_slit(&mut report, 3, &[10, 20, 30, 20, 10, 40, 30, 40, 10]);
    assert_eq!(report.diagnostics().errors(), 0);

    validate_slit(&mut report, 3, &[10, 21, 30, 20, 10, 40, 30, 40, 10]);
    assert_eq!(report.diagnostics().errors(), 1);
}

#[test]
fn zero_length_madt_structure_is_one_error() {
    let mut body = vec![0u8; 8];
    // GICC type with a Length of zero, followed by padding.
    body.extend_from_slice(&[0x0B, 0x00, 0, 0, 0, 0, 0, 0]);
    let madt = common::table(b"APIC", 5, &body);

    let memory = PhysRegions::new();
    let mut out = String::new();
    let summary = {
        let mut session = Session::new(&memory, &mut out, ReportOptions::default());
        session.process_table_bytes(&madt).unwrap()
    };
    assert_eq!(summary.diagnostics.errors(), 1, "{out}");
    assert!(out.contains("Invalid Interrupt Controller Structure length"));
}

#[test]
fn single_tables_can_be_traced_from_a_buffer() {
    let memory = PhysRegions::new();
    let mut out = String::new();
    let summary = {
        let mut session = Session::new(&memory, &mut out, ReportOptions::default());
        session.process_table_bytes(&common::facs()).unwrap()
    };
    assert_eq!(summary.diagnostics.errors(), 0);
    assert_eq!(summary.tables, 1);
    assert!(out.contains("FACS Table"));
}

fn rust_sources(dir: &std::path::Path, found: &mut Vec<std::path::PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_sources(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            found.push(path);
        }
    }
}

#[test]
fn source_lines_fit_in_one_hundred_columns() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    rust_sources(&root.join("src"), &mut files);
    rust_sources(&root.join("tests"), &mut files);
    assert!(!files.is_empty());
    for file in files {
        let text = std::fs::read_to_string(&file).unwrap();
        for (n, line) in text.lines().enumerate() {
            let width = line.chars().count();
            assert!(width <= 100, "{}:{} is {width} columns", file.display(), n + 1);
        }
    }
}
