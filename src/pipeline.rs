//! End-to-end normalization driver.
//!
//! One best-effort pass per table: detect-or-accept a source profile,
//! resolve columns, rename to canonical names, clean date and numeric
//! fields, validate, stamp provenance. Everything recoverable lands in
//! the returned [`QualityReport`]; the only fatal runtime error is the
//! validator's all-rows-removed condition.

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use thiserror::Error;

use crate::cleaners;
use crate::detect::{self, Detection};
use crate::matcher::{self, DEFAULT_FUZZY_THRESHOLD};
use crate::registry::{FieldKind, Registry};
use crate::table::{Table, Value};
use crate::validate::{self, AllRowsRemoved, QualityReport};

/// Provenance columns stamped onto every cleaned row.
pub const LOADED_AT: &str = "loaded_at";
pub const SOURCE_FILE: &str = "source_file";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown source profile '{0}'")]
    UnknownProfile(String),
    #[error(transparent)]
    Validation(#[from] AllRowsRemoved),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Bypass detection with this profile name.
    pub profile_override: Option<String>,
    /// Minimum similarity (0-100) for fuzzy column matches.
    pub fuzzy_threshold: f64,
    /// Processing timestamp used for future-date checks and the
    /// `loaded_at` stamp. Injected so runs are reproducible under test.
    pub processed_at: NaiveDateTime,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            profile_override: None,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            processed_at: Local::now().naive_local(),
        }
    }
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub table: Table,
    pub report: QualityReport,
    /// Profile the run settled on, detected or overridden.
    pub profile: String,
    /// Present only when detection ran.
    pub detection: Option<Detection>,
}

/// Runs the full normalization pass over `table`. `source_id` is used
/// only for provenance stamping.
pub fn run(
    registry: &Registry,
    mut table: Table,
    source_id: &str,
    options: &PipelineOptions,
) -> Result<PipelineOutcome, PipelineError> {
    let mut audit: Vec<String> = Vec::new();

    let (profile_name, detection) = match &options.profile_override {
        Some(name) => (name.clone(), None),
        None => {
            let detection = detect::detect(registry, table.columns());
            info!(
                "Detected source system '{}' ({:.0}% confidence)",
                detection.profile,
                detection.confidence * 100.0
            );
            if detection.is_low_confidence() {
                warn!(
                    "Low-confidence detection; pass an explicit profile if '{}' is wrong",
                    detection.profile
                );
                audit.push(format!(
                    "Low-confidence detection: best guess '{}' at {:.0}%",
                    detection.profile,
                    detection.confidence * 100.0
                ));
            }
            (detection.profile.clone(), Some(detection))
        }
    };
    let profile = registry
        .profile(&profile_name)
        .ok_or_else(|| PipelineError::UnknownProfile(profile_name.clone()))?;

    let outcome = matcher::match_columns(table.columns(), profile, options.fuzzy_threshold);
    for m in outcome.fuzzy_matches() {
        info!(
            "Fuzzy-matched column '{}' to '{}' ({:.0}%)",
            m.source_column, m.field, m.score
        );
        audit.push(format!(
            "Fuzzy-matched column '{}' to '{}' ({:.0}% similarity)",
            m.source_column, m.field, m.score
        ));
    }
    if !outcome.unmatched.is_empty() {
        warn!(
            "Could not match canonical fields: {}",
            outcome.unmatched.join(", ")
        );
        audit.push(format!(
            "Unmatched canonical fields: {}",
            outcome.unmatched.join(", ")
        ));
    }
    table.rename_columns(&outcome.rename_map());

    for field in registry.schema().fields_of_kind(FieldKind::Date) {
        let cleaned = cleaners::clean_dates(&mut table, &field.name, options.processed_at);
        if cleaned.future_rows_removed > 0 {
            warn!(
                "Removed {} rows with future {}",
                cleaned.future_rows_removed, field.name
            );
            audit.push(format!(
                "Removed {} rows with future {}",
                cleaned.future_rows_removed, field.name
            ));
        }
    }
    for field in registry.schema().fields_of_kind(FieldKind::Numeric) {
        cleaners::clean_numeric(&mut table, &field.name);
    }

    let (mut clean, mut report) = validate::validate(table, registry.schema())?;

    clean.append_column(
        LOADED_AT,
        Value::Text(options.processed_at.format(TIMESTAMP_FORMAT).to_string()),
    );
    clean.append_column(SOURCE_FILE, Value::Text(source_id.to_string()));

    let mut kept: Vec<&str> = registry
        .schema()
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .collect();
    kept.push(LOADED_AT);
    kept.push(SOURCE_FILE);
    let clean = clean.project(&kept);

    report.prepend_issues(audit);
    info!(
        "Cleaned '{}': {} -> {} rows ({} removed, {:.1}% quality)",
        source_id,
        report.original_rows,
        report.final_rows,
        report.rows_removed,
        report.quality_ratio() * 100.0
    );

    Ok(PipelineOutcome {
        table: clean,
        report,
        profile: profile_name,
        detection,
    })
}
