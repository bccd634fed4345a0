//! Per-column normalization of date and numeric fields.
//!
//! Both cleaners are per-cell and never fail: a value that cannot be
//! coerced becomes `Null` and is left for the validator's rules to count.
//! Re-running a cleaner on already-clean data is a no-op.

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

use crate::table::{Table, Value};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const CURRENCY_SYMBOLS: &[char] = &['₹', '$', '€', '£'];
const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Attempts the supported date and datetime formats in order.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.date());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateCleanOutcome {
    /// Rows dropped because their date lies after the processing time.
    pub future_rows_removed: usize,
    /// Cells that could not be parsed and were nulled.
    pub coerced_to_null: usize,
}

/// Parses `column` as dates, nulls unparseable cells, removes rows dated
/// strictly after `now`, and re-serializes survivors as `YYYY-MM-DD`.
/// A missing column is a no-op.
pub fn clean_dates(table: &mut Table, column: &str, now: NaiveDateTime) -> DateCleanOutcome {
    let Some(index) = table.column_index(column) else {
        return DateCleanOutcome::default();
    };

    let mut outcome = DateCleanOutcome::default();
    let mut parsed: Vec<Option<NaiveDate>> = Vec::with_capacity(table.row_count());
    table.map_column(index, |cell| match cell {
        Value::Null => {
            parsed.push(None);
            Value::Null
        }
        Value::Text(raw) => match parse_flexible_date(raw) {
            Some(date) => {
                parsed.push(Some(date));
                Value::Text(date.format(OUTPUT_DATE_FORMAT).to_string())
            }
            None => {
                parsed.push(None);
                outcome.coerced_to_null += 1;
                Value::Null
            }
        },
        Value::Number(_) => {
            parsed.push(None);
            outcome.coerced_to_null += 1;
            Value::Null
        }
    });

    let today = now.date();
    outcome.future_rows_removed =
        table.retain_rows(|row_index, _| !parsed[row_index].is_some_and(|date| date > today));

    if outcome.coerced_to_null > 0 {
        debug!(
            "Nulled {} unparseable values in '{column}'",
            outcome.coerced_to_null
        );
    }
    outcome
}

/// Strips currency symbols and thousands separators from `column`'s text
/// cells and coerces them to floats; anything non-numeric becomes `Null`.
/// A missing column is a no-op. Returns the nulled-cell count.
pub fn clean_numeric(table: &mut Table, column: &str) -> usize {
    let Some(index) = table.column_index(column) else {
        return 0;
    };

    let mut coerced_to_null = 0;
    table.map_column(index, |cell| match cell {
        Value::Null => Value::Null,
        Value::Number(n) => Value::Number(*n),
        Value::Text(raw) => {
            let stripped: String = raw
                .chars()
                .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
                .collect();
            match stripped.parse::<f64>() {
                Ok(number) if number.is_finite() => Value::Number(number),
                _ => {
                    coerced_to_null += 1;
                    Value::Null
                }
            }
        }
    });

    if coerced_to_null > 0 {
        debug!("Nulled {coerced_to_null} non-numeric values in '{column}'");
    }
    coerced_to_null
}
