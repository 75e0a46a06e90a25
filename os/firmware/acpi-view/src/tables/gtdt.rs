//! # GTDT (Generic Timer Description Table)
//!
//! The fixed part describes the per-processor timers. It is followed, at
//! Platform Timer Offset, by Platform Timer Count structures: GT Blocks
//! (each carrying up to eight timer frames) and SBSA Generic Watchdogs.

use super::{NamedSchema, check_array_bounds, parse_fixed};
use crate::field::{Field, schema_len};
use crate::format::le_value_any;
use crate::report::Report;
use crate::walker::{self, RecordHeader, Records};
use crate::{Session, Table};
use bitfield_struct::bitfield;

/// Flags of a generic timer interrupt.
#[bitfield(u32)]
pub struct TimerFlags {
    /// 1: edge triggered, 0: level triggered.
    pub edge_triggered: bool,
    /// 1: active low, 0: active high.
    pub active_low: bool,
    pub always_on: bool,
    #[bits(29)]
    pub reserved: u32,
}

fn validate_timer_flags(report: &mut Report<'_>, bytes: &[u8]) {
    let flags = TimerFlags::from_bits(u32::try_from(le_value_any(bytes)).unwrap_or(0));
    if flags.reserved() != 0 {
        report_error!(report, "Timer Flags reserved bits [31:3] must be zero.");
    }
}

fn validate_gt_block_timer_count(report: &mut Report<'_>, bytes: &[u8]) {
    let count = le_value_any(bytes);
    if count > MAX_GT_BLOCK_TIMERS {
        report_error!(
            report,
            "Timer Count = {count}. It must be less than or equal to {MAX_GT_BLOCK_TIMERS}."
        );
    }
}

fn validate_gt_frame_number(report: &mut Report<'_>, bytes: &[u8]) {
    let frame = le_value_any(bytes);
    if frame >= MAX_GT_BLOCK_TIMERS {
        report_error!(report, "GT Frame Number = {frame}. GT Frame Number must be in range 0-7.");
    }
}

/// A GT Block holds at most this many timer frames.
pub const MAX_GT_BLOCK_TIMERS: u64 = 8;

pub const GTDT_FIELDS: &[Field] = acpi_header_fields![
    Field::hex("CntControlBase Physical Address", 8, 36),
    Field::reserved(4, 44),
    Field::hex("Secure EL1 timer GSIV", 4, 48),
    Field::hex("Secure EL1 timer FLAGS", 4, 52).check_with(validate_timer_flags),
    Field::hex("Non-Secure EL1 timer GSIV", 4, 56),
    Field::hex("Non-Secure EL1 timer FLAGS", 4, 60).check_with(validate_timer_flags),
    Field::hex("Virtual timer GSIV", 4, 64),
    Field::hex("Virtual timer FLAGS", 4, 68).check_with(validate_timer_flags),
    Field::hex("Non-Secure EL2 timer GSIV", 4, 72),
    Field::hex("Non-Secure EL2 timer FLAGS", 4, 76).check_with(validate_timer_flags),
    Field::hex("CntReadBase Physical address", 8, 80),
    Field::dec("Platform Timer Count", 4, 88),
    Field::dec("Platform Timer Offset", 4, 92),
];

/// Trailing fields added in revision 3.
pub const GTDT_REV3_FIELDS: &[Field] = &[
    Field::hex("Virtual EL2 Timer GSIV", 4, 0),
    Field::hex("Virtual EL2 Timer Flags", 4, 4).check_with(validate_timer_flags),
];

pub const PLATFORM_TIMER_HEADER: &[Field] = &[Field::hex("Type", 1, 0), Field::dec("Length", 2, 1)];

const PLATFORM_TIMER: RecordHeader = RecordHeader {
    schema: PLATFORM_TIMER_HEADER,
    type_field: "Type",
    length_field: "Length",
    what: "Platform Timer Structure",
};

pub const GT_BLOCK: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 2, 1),
    Field::reserved(1, 3),
    Field::hex("Physical address (CntCtlBase)", 8, 4),
    Field::dec("Timer Count", 4, 12).check_with(validate_gt_block_timer_count),
    Field::dec("Timer Offset", 4, 16),
];

pub const GT_BLOCK_TIMER: &[Field] = &[
    Field::dec("Frame Number", 1, 0).check_with(validate_gt_frame_number),
    Field::reserved(3, 1),
    Field::hex("Physical address (CntBaseX)", 8, 4),
    Field::hex("Physical address (CntEL0BaseX)", 8, 12),
    Field::hex("Physical Timer GSIV", 4, 20),
    Field::hex("Physical Timer Flags", 4, 24).check_with(validate_timer_flags),
    Field::hex("Virtual Timer GSIV", 4, 28),
    Field::hex("Virtual Timer Flags", 4, 32).check_with(validate_timer_flags),
    Field::hex("Common Flags", 4, 36),
];

pub const SBSA_WATCHDOG: &[Field] = &[
    Field::hex("Type", 1, 0),
    Field::dec("Length", 2, 1),
    Field::reserved(1, 3),
    Field::hex("RefreshFrame Physical address", 8, 4),
    Field::hex("ControlFrame Physical address", 8, 12),
    Field::hex("Watchdog Timer GSIV", 4, 20),
    Field::hex("Watchdog Timer Flags", 4, 24),
];

pub const SCHEMAS: &[NamedSchema] = &[
    ("GTDT", GTDT_FIELDS),
    ("GTDT Revision 3 Extension", GTDT_REV3_FIELDS),
    ("Platform Timer Header", PLATFORM_TIMER_HEADER),
    ("GT Block", GT_BLOCK),
    ("GT Block Timer", GT_BLOCK_TIMER),
    ("SBSA Generic Watchdog", SBSA_WATCHDOG),
];

const GT_BLOCK_TYPE: u64 = 0;
const SBSA_WATCHDOG_TYPE: u64 = 1;

fn parse_gt_block(report: &mut Report<'_>, bytes: &[u8]) {
    let block = walker::parse(report, 2, Some("GT Block"), bytes, GT_BLOCK);
    let (Some(count), Some(offset)) = (block.u64("Timer Count"), block.usize("Timer Offset")) else {
        report_error!(report, "Insufficient GT Block Structure length. Length = {}.", bytes.len());
        return;
    };
    let count = count.min(MAX_GT_BLOCK_TIMERS);
    if count == 0 {
        return;
    }
    if offset < schema_len(GT_BLOCK) {
        report_error!(report, "GT Block Timer Offset {offset} overlaps the GT Block header.");
        return;
    }
    let entries = usize::try_from(count).unwrap_or(usize::MAX);
    if !check_array_bounds(
        report,
        "GT Block Timer array",
        offset,
        entries,
        schema_len(GT_BLOCK_TIMER),
        bytes.len(),
    ) {
        return;
    }
    walker::parse_array(report, 4, "GT Block Timer", bytes, offset, count, GT_BLOCK_TIMER);
}

pub(crate) fn parse(session: &mut Session<'_>, table: &Table<'_>) {
    let report = session.report();
    let Some(gtdt) = parse_fixed(report, "GTDT", table.bytes, GTDT_FIELDS) else {
        return;
    };
    let mut fixed_end = gtdt.consumed();
    if table.revision >= 3 {
        let tail = table.bytes.get(fixed_end..).unwrap_or_default();
        fixed_end += walker::parse(report, 0, None, tail, GTDT_REV3_FIELDS).consumed();
    }

    let (Some(count), Some(offset)) = (
        gtdt.u32("Platform Timer Count"),
        gtdt.usize("Platform Timer Offset"),
    ) else {
        return;
    };
    if count == 0 {
        return;
    }
    if offset < fixed_end || offset >= table.bytes.len() {
        report_error!(
            report,
            "Invalid Platform Timer Offset {offset}. Must lie between {fixed_end} and the table \
            length {}.",
            table.bytes.len()
        );
        return;
    }

    let mut timers =
        Records::new("GTDT", table.bytes, offset, PLATFORM_TIMER).limit(u64::from(count));
    let mut index = 0u32;
    while let Some(record) = timers.next_record(report) {
        match record.kind {
            GT_BLOCK_TYPE => parse_gt_block(report, record.bytes),
            SBSA_WATCHDOG_TYPE => {
                walker::parse(
                    report,
                    2,
                    Some("SBSA Generic Watchdog"),
                    record.bytes,
                    SBSA_WATCHDOG,
                );
            }
            other => {
                report_error!(report, "Invalid Platform Timer Type {other} at index {index}.");
            }
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::testing::{table, trace};
    use alloc::string::String;
    use alloc::vec::Vec;

    /// A GT Block declaring `timer_count` timers, followed by one timer
    /// frame per entry of `frames`.
    fn gt_block(timer_count: u32, frames: &[u8]) -> Vec<u8> {
        let mut b = vec![0u8; 20];
        b[12..16].copy_from_slice(&timer_count.to_le_bytes());
        b[16..20].copy_from_slice(&20u32.to_le_bytes());
        for &frame in frames {
            let mut timer = [0u8; 40];
            timer[0] = frame;
            b.extend_from_slice(&timer);
        }
        let length = u16::try_from(b.len()).unwrap();
        b[1..3].copy_from_slice(&length.to_le_bytes());
        b
    }

    fn block_errors(block: &[u8]) -> (u32, String) {
        let mut out = String::new();
        let mut r = Report::new(&mut out);
        parse_gt_block(&mut r, block);
        let errors = r.diagnostics().errors();
        drop(r);
        (errors, out)
    }

    #[test]
    fn timer_flag_bits() {
        let f = TimerFlags::from_bits(0b101);
        assert!(f.edge_triggered() && !f.active_low() && f.always_on());
        assert_eq!(TimerFlags::from_bits(0b1000).reserved(), 1);
    }

    #[test]
    fn gt_block_in_a_table_is_clean() {
        let mut body = vec![0u8; 60];
        body[52..56].copy_from_slice(&1u32.to_le_bytes());
        body[56..60].copy_from_slice(&96u32.to_le_bytes());
        body.extend_from_slice(&gt_block(2, &[0, 1]));
        let (diagnostics, out) = trace(&table(b"GTDT", 2, &body));
        assert!(diagnostics.is_clean(), "{out}");
        assert_eq!(out.matches("Frame Number").count(), 2);
    }

    #[test]
    fn more_than_eight_timers_is_an_error() {
        let frames: Vec<u8> = (0..9).collect();
        let (errors, out) = block_errors(&gt_block(9, &frames));
        assert_eq!(errors, 1);
        assert!(out.contains("Timer Count = 9"));
        // Only the first eight frames are traced.
        assert_eq!(out.matches("Frame Number").count(), 8);
    }

    #[test]
    fn frame_number_must_be_below_eight() {
        let (errors, out) = block_errors(&gt_block(2, &[0, 8]));
        assert_eq!(errors, 1);
        assert!(out.contains("GT Frame Number = 8"));
    }
}
