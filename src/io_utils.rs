//! CSV reading and writing for normalization runs.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` ->
//!   comma, `.tsv` -> tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8;
//!   output is always UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard
//!   streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::table::{Table, Value};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delimiter) = provided {
        return delimiter;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Materializes a delimited file (or stdin via `-`) as a [`Table`].
/// Header row required; empty fields become nulls.
pub fn read_table(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader
        .byte_headers()
        .with_context(|| format!("Reading headers from {path:?}"))?
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect::<Result<Vec<String>>>()?;
    let mut table = Table::new(headers);

    for (row_index, record) in csv_reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} in {path:?}", row_index + 2))?;
        let cells = record
            .iter()
            .map(|field| Ok(Value::from_raw(&decode_bytes(field, encoding)?)))
            .collect::<Result<Vec<Value>>>()?;
        table
            .push_row(cells)
            .with_context(|| format!("Row {} in {path:?}", row_index + 2))?;
    }
    Ok(table)
}

/// Writes `table` as delimited UTF-8 to `path`, or stdout when `path` is
/// omitted or `-`.
pub fn write_table(table: &Table, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .double_quote(true)
        .from_writer(writer);

    csv_writer
        .write_record(table.columns())
        .context("Writing header row")?;
    for (row_index, row) in table.rows().iter().enumerate() {
        csv_writer
            .write_record(row.iter().map(Value::render))
            .with_context(|| format!("Writing row {}", row_index + 1))?;
    }
    csv_writer.flush().context("Flushing CSV output")?;
    Ok(())
}
