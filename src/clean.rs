//! The `clean` subcommand: one command to normalize any supported export.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{
    cli::CleanArgs,
    io_utils,
    pipeline::{self, PipelineOptions},
    registry::Registry,
};

pub fn execute(args: &CleanArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let registry = load_registry(args.config.as_deref())?;
    info!(
        "Cleaning '{}' (delimiter '{}', known profiles: {})",
        args.input.display(),
        io_utils::printable_delimiter(delimiter),
        registry.profile_names().iter().join(", ")
    );

    let table = io_utils::read_table(&args.input, delimiter, input_encoding)?;
    info!(
        "Read {} row(s) across {} column(s)",
        table.row_count(),
        table.columns().len()
    );

    let source_id = args
        .source_id
        .clone()
        .unwrap_or_else(|| source_id_for(&args.input));
    let options = PipelineOptions {
        profile_override: args.profile.clone(),
        fuzzy_threshold: args.fuzzy_threshold,
        ..PipelineOptions::default()
    };
    let outcome = pipeline::run(&registry, table, &source_id, &options)?;

    for issue in &outcome.report.issues {
        info!("  - {issue}");
    }

    let output_delimiter =
        io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter, delimiter);
    io_utils::write_table(&outcome.table, args.output.as_deref(), output_delimiter)?;

    if let Some(report_path) = &args.report {
        let file = File::create(report_path)
            .with_context(|| format!("Creating report file {report_path:?}"))?;
        serde_json::to_writer_pretty(file, &outcome.report)
            .with_context(|| format!("Writing quality report to {report_path:?}"))?;
        info!("Quality report written to {report_path:?}");
    }
    Ok(())
}

pub(crate) fn load_registry(config: Option<&Path>) -> Result<Registry> {
    match config {
        Some(path) => Registry::load(path),
        None => Registry::builtin(),
    }
}

fn source_id_for(input: &Path) -> String {
    if io_utils::is_dash(input) {
        "stdin".to_string()
    } else {
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string())
    }
}
