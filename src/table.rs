//! In-memory table model shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of column names plus row-major cell
//! storage. Cells are [`Value`]s: raw CSV fields arrive as `Text` (empty
//! fields become `Null`), and the cleaners coerce them to `Number` or
//! ISO-date `Text` in place. Every row always has exactly one cell per
//! column.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Converts a raw CSV field into a cell. Empty and whitespace-only
    /// fields are treated as nulls.
    pub fn from_raw(field: &str) -> Self {
        if field.trim().is_empty() {
            Value::Null
        } else {
            Value::Text(field.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the cell for CSV output. Nulls become empty fields and
    /// integral floats print without a trailing `.0`.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "Row has {} cells but the table has {} columns",
            row.len(),
            self.columns.len()
        );
        self.rows.push(row);
        Ok(())
    }

    /// Renames columns according to `mapping` (old name -> new name).
    /// Columns absent from the mapping keep their names.
    pub fn rename_columns(&mut self, mapping: &BTreeMap<String, String>) {
        for column in &mut self.columns {
            if let Some(renamed) = mapping.get(column) {
                *column = renamed.clone();
            }
        }
    }

    /// Keeps rows for which `keep` returns true and reports how many were
    /// dropped. The predicate receives the row's original index.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let before = self.rows.len();
        let mut index = 0;
        self.rows.retain(|row| {
            let keep_row = keep(index, row);
            index += 1;
            keep_row
        });
        before - self.rows.len()
    }

    /// Rewrites every cell of one column in place.
    pub fn map_column<F>(&mut self, column_index: usize, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            row[column_index] = f(&row[column_index]);
        }
    }

    /// Appends a column holding the same value in every row.
    pub fn append_column(&mut self, name: &str, value: Value) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    /// Returns a table containing only the named columns, in the order
    /// given. Names without a matching column are skipped.
    pub fn project(&self, names: &[&str]) -> Table {
        let indices: Vec<usize> = names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new(vec!["id".into(), "amount".into()]);
        table
            .push_row(vec![Value::Text("1".into()), Value::Number(10.0)])
            .unwrap();
        table
            .push_row(vec![Value::Text("2".into()), Value::Number(-3.5)])
            .unwrap();
        table
    }

    #[test]
    fn from_raw_treats_blank_fields_as_null() {
        assert_eq!(Value::from_raw(""), Value::Null);
        assert_eq!(Value::from_raw("   "), Value::Null);
        assert_eq!(Value::from_raw("x"), Value::Text("x".into()));
    }

    #[test]
    fn render_formats_integral_floats_without_fraction() {
        assert_eq!(Value::Number(1200.0).render(), "1200");
        assert_eq!(Value::Number(12.5).render(), "12.5");
        assert_eq!(Value::Null.render(), "");
    }

    #[test]
    fn push_row_rejects_width_mismatch() {
        let mut table = Table::new(vec!["a".into()]);
        assert!(table.push_row(vec![Value::Null, Value::Null]).is_err());
    }

    #[test]
    fn rename_columns_applies_mapping_and_keeps_others() {
        let mut table = sample_table();
        let mapping = BTreeMap::from([("id".to_string(), "transaction_id".to_string())]);
        table.rename_columns(&mapping);
        assert_eq!(table.columns(), ["transaction_id", "amount"]);
    }

    #[test]
    fn retain_rows_reports_removed_count() {
        let mut table = sample_table();
        let removed = table.retain_rows(|_, row| row[1].as_number().is_some_and(|n| n > 0.0));
        assert_eq!(removed, 1);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn project_keeps_requested_order_and_skips_absent() {
        let table = sample_table();
        let projected = table.project(&["amount", "missing", "id"]);
        assert_eq!(projected.columns(), ["amount", "id"]);
        assert_eq!(projected.rows()[0][0], Value::Number(10.0));
    }
}
