use chrono::NaiveDate;

use erp_normalize::pipeline::{self, LOADED_AT, PipelineError, PipelineOptions, SOURCE_FILE};
use erp_normalize::registry::{Registry, RegistryConfig};
use erp_normalize::table::{Table, Value};

fn registry_from(yaml: &str) -> Registry {
    let config: RegistryConfig = serde_yaml::from_str(yaml).expect("parse test registry");
    Registry::from_config(config).expect("valid test registry")
}

fn simple_registry() -> Registry {
    registry_from(
        r#"
canonical:
  fields:
    - { name: transaction_id, kind: identifier, required: true }
    - { name: transaction_date, kind: date, required: true }
    - { name: quantity, kind: numeric, required: true }
    - { name: unit_price, kind: numeric, required: true }
profiles:
  - name: pos
    columns:
      - { field: transaction_id, column: id }
      - { field: transaction_date, column: sold_on }
      - { field: quantity, column: qty }
      - { field: unit_price, column: price }
"#,
    )
}

fn table_from(headers: &[&str], rows: &[&[&str]]) -> Table {
    let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        table
            .push_row(row.iter().map(|cell| Value::from_raw(cell)).collect())
            .expect("row width");
    }
    table
}

fn fixed_options() -> PipelineOptions {
    PipelineOptions {
        processed_at: NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        ..PipelineOptions::default()
    }
}

#[test]
fn exact_headers_detect_with_full_confidence() {
    let registry = simple_registry();
    let table = table_from(
        &["id", "sold_on", "qty", "price"],
        &[&["T1", "2024-01-05", "2", "50"]],
    );
    let outcome = pipeline::run(&registry, table, "sales.csv", &fixed_options()).unwrap();
    assert_eq!(outcome.profile, "pos");
    let detection = outcome.detection.expect("detection ran");
    assert_eq!(detection.confidence, 1.0);
    assert!(!detection.is_low_confidence());
}

#[test]
fn currency_prices_and_duplicate_ids_are_cleaned() {
    // Duplicate id with a negative quantity plus a currency-formatted
    // price, all in one export.
    let registry = simple_registry();
    let table = table_from(
        &["id", "sold_on", "qty", "price"],
        &[
            &["1", "2024-01-05", "5", "₹1,200"],
            &["1", "2024-01-05", "-3", "100"],
            &["2", "2024-01-06", "2", "50"],
        ],
    );
    let outcome = pipeline::run(&registry, table, "sales.csv", &fixed_options()).unwrap();

    assert_eq!(outcome.report.original_rows, 3);
    assert_eq!(outcome.report.final_rows, 2);
    assert_eq!(outcome.report.rows_removed, 1);

    let price = outcome.table.column_index("unit_price").unwrap();
    let prices: Vec<f64> = outcome
        .table
        .rows()
        .iter()
        .map(|row| row[price].as_number().expect("price is numeric"))
        .collect();
    assert_eq!(prices, [1200.0, 50.0]);
}

#[test]
fn all_invalid_quantities_fail_the_run() {
    let registry = simple_registry();
    let table = table_from(
        &["id", "sold_on", "qty", "price"],
        &[
            &["T1", "2024-01-05", "0", "10"],
            &["T2", "2024-01-05", "-2", "10"],
        ],
    );
    let err = pipeline::run(&registry, table, "sales.csv", &fixed_options()).unwrap_err();
    match err {
        PipelineError::Validation(inner) => assert_eq!(inner.original_rows, 2),
        other => panic!("Expected validation failure, got {other:?}"),
    }
}

#[test]
fn provenance_columns_are_stamped_on_every_row() {
    let registry = simple_registry();
    let table = table_from(
        &["id", "sold_on", "qty", "price"],
        &[&["T1", "2024-01-05", "1", "10"], &["T2", "2024-01-06", "1", "20"]],
    );
    let outcome = pipeline::run(&registry, table, "march_sales.csv", &fixed_options()).unwrap();

    let loaded_at = outcome.table.column_index(LOADED_AT).unwrap();
    let source = outcome.table.column_index(SOURCE_FILE).unwrap();
    for row in outcome.table.rows() {
        assert_eq!(row[loaded_at], Value::Text("2024-06-15T09:30:00".into()));
        assert_eq!(row[source], Value::Text("march_sales.csv".into()));
    }
}

#[test]
fn future_dates_are_reported_but_not_counted_as_validation_removals() {
    let registry = simple_registry();
    let table = table_from(
        &["id", "sold_on", "qty", "price"],
        &[
            &["T1", "2024-01-05", "1", "10"],
            &["T2", "2031-01-01", "1", "10"],
        ],
    );
    let outcome = pipeline::run(&registry, table, "sales.csv", &fixed_options()).unwrap();

    assert!(
        outcome
            .report
            .issues
            .iter()
            .any(|issue| issue.contains("future transaction_date"))
    );
    // The future row is removed before validation, so the validator saw
    // one row and removed none.
    assert_eq!(outcome.report.original_rows, 1);
    assert_eq!(outcome.report.rows_removed, 0);
    assert_eq!(outcome.table.row_count(), 1);
}

#[test]
fn missing_required_column_passes_rows_and_records_issue() {
    // The export has no date column at all: rows survive, the gap is
    // reported, and the output simply lacks that column.
    let registry = simple_registry();
    let table = table_from(&["id", "qty", "price"], &[&["T1", "1", "10"]]);
    let outcome = pipeline::run(&registry, table, "sales.csv", &fixed_options()).unwrap();

    assert_eq!(outcome.table.row_count(), 1);
    assert!(!outcome.table.has_column("transaction_date"));
    assert!(
        outcome
            .report
            .issues
            .iter()
            .any(|issue| issue.contains("Unmatched canonical fields: transaction_date"))
    );
    assert!(
        outcome
            .report
            .issues
            .iter()
            .any(|issue| issue.contains("missing from input") && issue.contains("transaction_date"))
    );
}

#[test]
fn unknown_profile_override_is_rejected() {
    let registry = simple_registry();
    let table = table_from(&["id", "qty", "price"], &[&["T1", "1", "10"]]);
    let options = PipelineOptions {
        profile_override: Some("sap".into()),
        ..fixed_options()
    };
    let err = pipeline::run(&registry, table, "sales.csv", &options).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownProfile(name) if name == "sap"));
}

#[test]
fn typo_headers_fuzzy_match_and_are_audited() {
    let registry = simple_registry();
    let table = table_from(
        &["id", "sold_no", "qty", "price"],
        &[&["T1", "2024-01-05", "1", "10"]],
    );
    let outcome = pipeline::run(&registry, table, "sales.csv", &fixed_options()).unwrap();

    assert!(outcome.table.has_column("transaction_date"));
    assert!(
        outcome
            .report
            .issues
            .iter()
            .any(|issue| issue.contains("Fuzzy-matched column 'sold_no'"))
    );
}
