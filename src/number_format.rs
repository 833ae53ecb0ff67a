//! Spreadsheet number formats that turn a stored serial number into date or
//! time text.
//!
//! Only the distinction that changes a cell's meaning is kept: a serial is a
//! date, a date with a time, a time of day, or a plain number. Dates render
//! as ISO 8601 text.

use chrono::{NaiveDate, NaiveTime, TimeDelta};

const SECONDS_PER_DAY: i64 = 86_400;
/// Serial of 9999-12-31, the last day a spreadsheet can display.
const MAX_SERIAL: f64 = 2_958_465.0;
/// Day offset between the 1904 and 1900 date systems.
const DATE1904_OFFSET: i64 = 1_462;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum CellFormat {
    #[default]
    General,
    Date,
    DateTime,
    Time,
}

impl CellFormat {
    /// Built-in format ids that display dates or times.
    pub(crate) fn builtin(id: u32) -> Self {
        match id {
            14..=17 => CellFormat::Date,
            22 => CellFormat::DateTime,
            18..=21 | 45..=47 => CellFormat::Time,
            _ => CellFormat::General,
        }
    }

    /// Classify a custom format code. Quoted literals, bracketed sections
    /// (colors, conditions, elapsed units) and escaped characters are
    /// ignored; `m` is ambiguous between month and minute and decides
    /// nothing on its own.
    pub(crate) fn parse_custom(code: &str) -> Self {
        let mut escaped = false;
        let mut quoted = false;
        let mut bracketed = false;
        let mut has_date = false;
        let mut has_time = false;

        for ch in code.chars() {
            match ch {
                _ if escaped => escaped = false,
                '\\' | '_' | '*' if !quoted => escaped = true,
                '"' => quoted = !quoted,
                _ if quoted => {}
                '[' => bracketed = true,
                ']' => bracketed = false,
                _ if bracketed => {}
                'y' | 'Y' | 'd' | 'D' => has_date = true,
                'h' | 'H' | 's' | 'S' => has_time = true,
                _ => {}
            }
        }

        match (has_date, has_time) {
            (true, true) => CellFormat::DateTime,
            (true, false) => CellFormat::Date,
            (false, true) => CellFormat::Time,
            (false, false) => CellFormat::General,
        }
    }

    /// Text for a stored numeric value, or `None` when the value should be
    /// kept as stored (general format, not a number, outside the calendar).
    pub(crate) fn render(self, raw: &str, date1904: bool) -> Option<String> {
        if self == CellFormat::General {
            return None;
        }
        let serial = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && (0.0..=MAX_SERIAL).contains(value))?;

        let total_seconds = (serial * SECONDS_PER_DAY as f64).round() as i64;
        let seconds = u32::try_from(total_seconds.rem_euclid(SECONDS_PER_DAY)).ok()?;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
        if self == CellFormat::Time {
            return Some(time.format("%H:%M:%S").to_string());
        }

        let mut days = total_seconds.div_euclid(SECONDS_PER_DAY);
        if date1904 {
            days += DATE1904_OFFSET;
        } else if days < 60 {
            // Serials before 1900-03-01 count the nonexistent 1900-02-29.
            days += 1;
        }
        let date =
            NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(TimeDelta::try_days(days)?)?;

        let text = match self {
            CellFormat::DateTime => date.and_time(time).format("%Y-%m-%d %H:%M:%S"),
            _ => date.format("%Y-%m-%d"),
        };
        Some(text.to_string())
    }
}
