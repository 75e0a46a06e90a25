//! # Generic table walker
//!
//! Interprets a schema over a byte buffer. Two entry points make the two
//! phases of parsing a variable-length record explicit:
//!
//! * [`peek`] visits the fields silently. It is used to read a record header
//!   (Type, Length) before the extent of the record is known, and by
//!   container tables that must be followed even when they are not traced.
//! * [`parse`] traces every field that fits, runs validators and checks the
//!   schema's own offsets.
//!
//! Both stop at the first field that would extend past the end of the buffer
//! and return a [`Parsed`] view holding the bytes actually covered.
//!
//! [`Records`] builds the per-table sub-record loop on top of these:
//! peek the header, check the Length, hand out the record, advance.

use crate::field::{Field, Parsed, Render, Validator};
use crate::format::{le_value, render_bytes, render_chars, render_int};
use crate::Report;

/// Silently visit the fields of `schema` that fit in `buffer`.
#[must_use]
pub fn peek<'a>(buffer: &'a [u8], schema: &'static [Field]) -> Parsed<'a> {
    let mut parsed = Parsed::new();
    let mut offset = 0;
    for field in schema {
        let Some(bytes) = buffer.get(offset..offset + field.length) else {
            break;
        };
        parsed.push(field.name, bytes);
        offset += field.length;
    }
    parsed
}

/// Trace the fields of `schema` that fit in `buffer`.
///
/// `indent` is added to the report's indentation for the duration of the call;
/// `name`, if given, is printed as a title line first.
pub fn parse<'a>(
    report: &mut Report<'_>,
    indent: usize,
    name: Option<&str>,
    buffer: &'a [u8],
    schema: &'static [Field],
) -> Parsed<'a> {
    report.indented(indent, |report| {
        if let Some(name) = name {
            report.title(name);
        }
        let mut parsed = Parsed::new();
        let mut offset = 0;
        for field in schema {
            let Some(bytes) = buffer.get(offset..offset + field.length) else {
                break;
            };
            if report.consistency_checks() && offset != field.offset {
                report_error!(
                    report,
                    "{}: Offset Mismatch for {}\nCurrentOffset = {} FieldOffset = {}",
                    name.unwrap_or("-"),
                    field.name,
                    offset,
                    field.offset
                );
            }
            trace_field(report, name, field, bytes);
            parsed.push(field.name, bytes);
            offset += field.length;
        }
        parsed
    })
}

fn trace_field(report: &mut Report<'_>, record: Option<&str>, field: &Field, bytes: &[u8]) {
    report.field_name(2, field.name);
    match field.render {
        Render::Int(format) => {
            if !render_int(report, format, bytes) {
                report_error!(
                    report,
                    "{}: CANNOT PARSE THIS FIELD, Field Length = {}",
                    record.unwrap_or("-"),
                    field.length
                );
            }
        }
        Render::Chars => render_chars(report, bytes),
        Render::Bytes => render_bytes(report, bytes),
        Render::Custom(f) => f(report, bytes),
        Render::Nested(schema) => {
            report.end_line();
            parse(report, 2, None, bytes, schema);
        }
        Render::Silent => {}
    }

    if report.consistency_checks()
        && let Some(validator) = field.validate
    {
        validate(report, field, validator, bytes);
    }
    report.end_line();
}

fn validate(report: &mut Report<'_>, field: &Field, validator: Validator, bytes: &[u8]) {
    match validator {
        Validator::Zero => {
            if bytes.iter().any(|&b| b != 0) {
                report_error!(report, "{} must be zero.", field.name);
            }
        }
        Validator::AtMost(max) => {
            if let Some(v) = le_value(bytes).filter(|&v| v > max) {
                report_error!(report, "{} = {v}. Must not exceed {max}.", field.name);
            }
        }
        Validator::OneOf(allowed) => {
            if let Some(v) = le_value(bytes).filter(|v| !allowed.contains(v)) {
                report_error!(report, "{} = 0x{v:X} is not a valid value.", field.name);
            }
        }
        Validator::Custom(check) => check(report, bytes),
    }
}

/// Layout of the Type/Length prefix shared by a table's sub-records.
#[derive(Copy, Clone)]
pub struct RecordHeader {
    /// Schema covering at least the type and length fields.
    pub schema: &'static [Field],
    pub type_field: &'static str,
    pub length_field: &'static str,
    /// Human-readable record kind for diagnostics, e.g. "Interrupt Controller
    /// Structure".
    pub what: &'static str,
}

/// A sub-record handed out by [`Records`].
#[derive(Debug, Copy, Clone)]
pub struct Record<'a> {
    pub kind: u64,
    /// Offset of the record within the enclosing buffer.
    pub offset: usize,
    /// The record bytes, exactly `Length` long.
    pub bytes: &'a [u8],
}

/// Iterates the type-tagged, length-prefixed records of a table.
///
/// A record whose header does not fit, whose Length is zero, or whose Length
/// runs past the buffer ends the iteration with an error: its size is unknown
/// and nothing after it can be located safely.
pub struct Records<'a> {
    buffer: &'a [u8],
    offset: usize,
    header: RecordHeader,
    table: &'static str,
    remaining: Option<u64>,
}

impl<'a> Records<'a> {
    /// Records from `start` to the end of `buffer`.
    #[must_use]
    pub const fn new(
        table: &'static str,
        buffer: &'a [u8],
        start: usize,
        header: RecordHeader,
    ) -> Self {
        Self {
            buffer,
            offset: start,
            header,
            table,
            remaining: None,
        }
    }

    /// Stop after at most `count` records.
    #[must_use]
    pub const fn limit(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }

    /// Offset of the next record.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// The next record, or `None` at the end of the buffer, after `count`
    /// records, or on a length violation (which is reported).
    pub fn next_record(&mut self, report: &mut Report<'_>) -> Option<Record<'a>> {
        if self.remaining == Some(0) || self.offset >= self.buffer.len() {
            return None;
        }
        let rest = &self.buffer[self.offset..];
        let head = peek(rest, self.header.schema);
        let (Some(kind), Some(length)) = (
            head.value(self.header.type_field),
            head.usize(self.header.length_field),
        ) else {
            report_error!(
                report,
                "Insufficient remaining table buffer length to read the {} header. Length = {}.",
                self.header.what,
                rest.len()
            );
            self.offset = self.buffer.len();
            return None;
        };
        if length == 0 || length > rest.len() {
            report_error!(
                report,
                "Invalid {} length. Length = {}. Offset = {}. {} length = {}.",
                self.header.what,
                length,
                self.offset,
                self.table,
                self.buffer.len()
            );
            self.offset = self.buffer.len();
            return None;
        }
        let record = Record {
            kind,
            offset: self.offset,
            bytes: &rest[..length],
        };
        self.offset += length;
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }
        Some(record)
    }
}

/// Walk `count` fixed-size entries of `schema` starting at `start`, titling each
/// `"{label} [i]"`. Stops early, with an error, if the entries do not fit.
pub fn parse_array(
    report: &mut Report<'_>,
    indent: usize,
    label: &str,
    buffer: &[u8],
    start: usize,
    count: u64,
    schema: &'static [Field],
) -> usize {
    let size = crate::field::schema_len(schema);
    let mut offset = start;
    for i in 0..count {
        let Some(entry) = offset
            .checked_add(size)
            .and_then(|end| buffer.get(offset..end))
        else {
            report_error!(
                report,
                "Insufficient length for {label} [{i}]. Offset = {offset}. Length = {}.",
                buffer.len()
            );
            break;
        };
        let title = alloc::format!("{label} [{i}]");
        parse(report, indent, Some(&title), entry, schema);
        offset += size;
    }
    offset - start
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    const SCHEMA: &[Field] = &[
        Field::hex("Type", 1, 0),
        Field::dec("Length", 1, 1),
        Field::hex("Value", 2, 2),
        Field::hex("Address", 8, 4),
    ];

    const BAD_OFFSETS: &[Field] = &[Field::hex("A", 1, 0), Field::hex("B", 2, 2)];

    const ODD_WIDTH: &[Field] = &[Field::hex("Triple", 3, 0)];

    #[test]
    fn consumed_is_sum_of_visited_fields() {
        let buf = [0u8; 64];
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        let p = parse(&mut r, 0, Some("T"), &buf, SCHEMA);
        assert_eq!(p.consumed(), 12);
        assert_eq!(p.visited(), 4);
        assert_eq!(r.diagnostics().errors(), 0);
    }

    #[test]
    fn truncated_buffer_visits_only_the_prefix() {
        let buf = [1u8, 6, 0x34, 0x12, 0xAA, 0xBB];
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        let p = parse(&mut r, 0, None, &buf, SCHEMA);
        assert_eq!(p.consumed(), 4);
        assert_eq!(p.u16("Value"), Some(0x1234));
        assert_eq!(p.value("Address"), None);
        drop(r);
        assert!(!out.contains("Address"));

        let p = peek(&buf[..1], SCHEMA);
        assert_eq!(p.consumed(), 1);
        assert_eq!(p.u8("Length"), None);
    }

    #[test]
    fn schema_offset_mismatch_is_reported() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        let p = parse(&mut r, 0, Some("Bad"), &[0u8; 8], BAD_OFFSETS);
        assert_eq!(p.consumed(), 3);
        assert_eq!(r.diagnostics().errors(), 1);
        drop(r);
        assert!(out.contains("Offset Mismatch for B"));
    }

    #[test]
    fn unsupported_int_width_is_an_error() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        parse(&mut r, 0, None, &[0u8; 3], ODD_WIDTH);
        assert_eq!(r.diagnostics().errors(), 1);
        drop(r);
        assert!(out.contains("CANNOT PARSE THIS FIELD, Field Length = 3"));
    }

    #[test]
    fn validators_run_only_when_enabled() {
        const CHECKED: &[Field] = &[
            Field::reserved(2, 0),
            Field::hex("Max", 1, 2).check(Validator::AtMost(3)),
        ];
        let buf = [0u8, 1, 9];

        let mut out = String::new();
        let mut r = Report::new(&mut out);
        parse(&mut r, 0, None, &buf, CHECKED);
        assert_eq!(r.diagnostics().errors(), 2);

        let mut out = String::new();
        let mut r = Report::new(&mut out).with_consistency_checks(false);
        parse(&mut r, 0, None, &buf, CHECKED);
        assert_eq!(r.diagnostics().errors(), 0);
    }

    const HDR: RecordHeader = RecordHeader {
        schema: &[Field::hex("Type", 1, 0), Field::dec("Length", 1, 1)],
        type_field: "Type",
        length_field: "Length",
        what: "Test Structure",
    };

    #[test]
    fn records_advance_by_length() {
        let buf = [7u8, 3, 0, 9, 2];
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        let mut it = Records::new("TEST", &buf, 0, HDR);
        let a = it.next_record(&mut r).unwrap();
        assert_eq!((a.kind, a.offset, a.bytes.len()), (7, 0, 3));
        let b = it.next_record(&mut r).unwrap();
        assert_eq!((b.kind, b.offset, b.bytes.len()), (9, 3, 2));
        assert!(it.next_record(&mut r).is_none());
        assert_eq!(r.diagnostics().errors(), 0);
    }

    #[test]
    fn zero_length_record_stops_with_one_error() {
        let buf = [7u8, 0, 0, 0, 7, 2];
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        let mut it = Records::new("TEST", &buf, 0, HDR);
        assert!(it.next_record(&mut r).is_none());
        assert!(it.next_record(&mut r).is_none());
        assert_eq!(r.diagnostics().errors(), 1);
    }

    #[test]
    fn overlong_and_truncated_headers() {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        assert!(Records::new("TEST", &[1u8, 9, 0], 0, HDR).next_record(&mut r).is_none());
        assert!(Records::new("TEST", &[1u8], 0, HDR).next_record(&mut r).is_none());
        assert_eq!(r.diagnostics().errors(), 2);
    }

    #[test]
    fn limit_caps_the_record_count() {
        let buf = [1u8, 2, 1, 2, 1, 2];
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        let mut it = Records::new("TEST", &buf, 0, HDR).limit(2);
        assert!(it.next_record(&mut r).is_some());
        assert!(it.next_record(&mut r).is_some());
        assert!(it.next_record(&mut r).is_none());
        assert_eq!(it.offset(), 4);
    }
}
