use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::matcher::DEFAULT_FUZZY_THRESHOLD;

#[derive(Debug, Parser)]
#[command(author, version, about = "Normalize ERP sales exports into a canonical schema", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean an ERP sales export into the canonical schema
    Clean(CleanArgs),
    /// Report which source system a file appears to come from
    Detect(DetectArgs),
    /// List the registered source-system profiles
    Profiles(ProfilesArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input CSV file to clean ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Registry configuration file (built-in defaults if omitted)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Source-system profile name, bypassing detection
    #[arg(short = 'p', long = "profile")]
    pub profile: Option<String>,
    /// Minimum similarity (0-100) for accepting a fuzzy column match
    #[arg(long = "fuzzy-threshold", default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    pub fuzzy_threshold: f64,
    /// Write the quality report as JSON to this path
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
    /// Source identifier stamped onto output rows (defaults to the input file name)
    #[arg(long = "source-id")]
    pub source_id: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Input CSV file to inspect ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Registry configuration file (built-in defaults if omitted)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfilesArgs {
    /// Registry configuration file (built-in defaults if omitted)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
