use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load CSV and XLSX files into typed SQL tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer a schema from a file and load its rows into a SQLite table
    Import(ImportArgs),
    /// Infer and print the schema of a file without loading it
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Input file (.csv or .xlsx)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// SQLite database file, created when missing
    #[arg(long = "db")]
    pub database: PathBuf,
    /// Table name (defaults to the input file name, sanitized)
    #[arg(short, long)]
    pub table: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input file (.csv or .xlsx)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Write the inferred schema as JSON to this path
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
    /// Also print the CREATE TABLE statement
    #[arg(long)]
    pub sql: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
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
