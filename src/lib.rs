pub mod clean;
pub mod cleaners;
pub mod cli;
pub mod detect;
pub mod io_utils;
pub mod matcher;
pub mod pipeline;
pub mod registry;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, warn};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("erp_normalize", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => clean::execute(&args),
        Commands::Detect(args) => handle_detect(&args),
        Commands::Profiles(args) => handle_profiles(&args),
    }
}

fn handle_detect(args: &cli::DetectArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let registry = clean::load_registry(args.config.as_deref())?;
    let table = io_utils::read_table(&args.input, delimiter, encoding)?;

    let detection = detect::detect(&registry, table.columns());
    println!(
        "{} ({:.0}% confidence)",
        detection.profile,
        detection.confidence * 100.0
    );
    if detection.is_low_confidence() {
        warn!(
            "Low-confidence detection; consider passing --profile to the clean command explicitly"
        );
    }
    Ok(())
}

fn handle_profiles(args: &cli::ProfilesArgs) -> Result<()> {
    let registry = clean::load_registry(args.config.as_deref())?;
    for profile in registry.profiles() {
        println!("{}:", profile.name);
        for entry in &profile.columns {
            println!("  {} <- {}", entry.field, entry.column);
        }
    }
    Ok(())
}
