//! Quality rules and the audit report.
//!
//! Rules run in a fixed order, each only when its column(s) exist, and
//! later rules see the table already pruned by earlier ones. Correctness
//! rules remove rows; plausibility rules only warn. The one fatal
//! condition in the whole pipeline is a table with no surviving rows.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::registry::{CanonicalSchema, COST_PRICE, QUANTITY, TRANSACTION_ID, UNIT_PRICE};
use crate::table::{Table, Value};

/// Terminal pipeline failure: every input row was removed.
#[derive(Debug, Clone, Error)]
#[error("all {original_rows} rows were removed during cleaning; check the input data quality")]
pub struct AllRowsRemoved {
    pub original_rows: usize,
}

/// Structured audit trail of one cleaning run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub original_rows: usize,
    pub final_rows: usize,
    pub rows_removed: usize,
    /// Human-readable issue lines, in the order the pipeline found them.
    pub issues: Vec<String>,
}

impl QualityReport {
    /// Surviving fraction of the input, 0.0..=1.0.
    pub fn quality_ratio(&self) -> f64 {
        if self.original_rows == 0 {
            0.0
        } else {
            self.final_rows as f64 / self.original_rows as f64
        }
    }

    /// Inserts audit lines gathered before validation (detection,
    /// matching, cleaning) ahead of the rule lines.
    pub fn prepend_issues(&mut self, lines: Vec<String>) {
        let mut combined = lines;
        combined.append(&mut self.issues);
        self.issues = combined;
    }
}

fn dedup_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.render()),
    }
}

/// Runs the rule pass over `table` and returns the pruned table plus the
/// report. `rows_removed` is `original - final` by construction.
pub fn validate(
    mut table: Table,
    schema: &CanonicalSchema,
) -> Result<(Table, QualityReport), AllRowsRemoved> {
    let original_rows = table.row_count();
    let mut report = QualityReport {
        original_rows,
        ..QualityReport::default()
    };

    // 1. Duplicate transaction identifiers: first occurrence wins. Null
    //    identifiers are left for the required-field rule below.
    if let Some(index) = table.column_index(TRANSACTION_ID) {
        let mut seen = HashSet::new();
        let removed = table.retain_rows(|_, row| match dedup_key(&row[index]) {
            Some(key) => seen.insert(key),
            None => true,
        });
        if removed > 0 {
            report
                .issues
                .push(format!("Removed {removed} duplicate transactions"));
        }
    }

    // 2. Nulls in required columns, per field in schema order.
    for field in schema.required_fields() {
        if let Some(index) = table.column_index(&field.name) {
            let removed = table.retain_rows(|_, row| !row[index].is_null());
            if removed > 0 {
                report
                    .issues
                    .push(format!("Removed {removed} rows with null {}", field.name));
            }
        }
    }

    // 3. Quantities must be positive numbers.
    if let Some(index) = table.column_index(QUANTITY) {
        let removed =
            table.retain_rows(|_, row| row[index].as_number().is_some_and(|n| n > 0.0));
        if removed > 0 {
            report
                .issues
                .push(format!("Removed {removed} rows with invalid quantity"));
        }
    }

    // 4. Unit prices must be positive numbers.
    if let Some(index) = table.column_index(UNIT_PRICE) {
        let removed =
            table.retain_rows(|_, row| row[index].as_number().is_some_and(|n| n > 0.0));
        if removed > 0 {
            report
                .issues
                .push(format!("Removed {removed} rows with invalid price"));
        }
    }

    // 5. Selling below cost is flagged for review, not removed.
    if let (Some(cost), Some(price)) = (
        table.column_index(COST_PRICE),
        table.column_index(UNIT_PRICE),
    ) {
        let flagged = table
            .rows()
            .iter()
            .filter(|row| match (row[cost].as_number(), row[price].as_number()) {
                (Some(cost), Some(price)) => cost > price,
                _ => false,
            })
            .count();
        if flagged > 0 {
            report
                .issues
                .push(format!("{flagged} rows have selling price below cost price"));
        }
    }

    // 6. Required fields with no column at all: schema drift signal. The
    //    affected rows pass through; only the gap is recorded.
    let missing: Vec<&str> = schema
        .required_fields()
        .filter(|field| !table.has_column(&field.name))
        .map(|field| field.name.as_str())
        .collect();
    if !missing.is_empty() {
        report.issues.push(format!(
            "Required fields missing from input: {}",
            missing.join(", ")
        ));
    }

    report.final_rows = table.row_count();
    report.rows_removed = original_rows - report.final_rows;
    debug!(
        "Validation kept {}/{} rows across {} issue(s)",
        report.final_rows,
        original_rows,
        report.issues.len()
    );

    if report.final_rows == 0 {
        return Err(AllRowsRemoved { original_rows });
    }
    Ok((table, report))
}
