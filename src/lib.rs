pub mod analyzer;
pub mod cli;
pub mod decode;
pub mod error;
pub mod io_utils;
pub mod logger;
pub mod materializer;
pub mod schema;
pub mod sql;
pub mod store;
pub mod table;
pub mod upload;
mod number_format;
mod xlsx;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, error, info};

use crate::{
    analyzer::CancelFlag,
    cli::{Cli, Commands},
    decode::ImportOptions,
    error::{ErrorClass, ImportError},
    logger::Logger,
    store::SqliteConnection,
    upload::Uploader,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet2sql", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => handle_import(&args),
        Commands::Probe(args) => handle_probe(&args),
    }
}

/// Message for stderr and process exit code for a failed command.
///
/// Import failures are classified; internal ones are logged in full and
/// reported with a fixed message. Anything else (unreadable input, unknown
/// encoding label) is reported as is with exit code 1.
pub fn describe_failure(err: &anyhow::Error) -> (String, i32) {
    let Some(import) = err.chain().find_map(|cause| cause.downcast_ref::<ImportError>()) else {
        return (format!("{err:#}"), 1);
    };
    let class = import.class();
    if class == ErrorClass::Internal {
        error!("{err:#}");
    }
    (import.public_message(), class.exit_code())
}

fn handle_import(args: &cli::ImportArgs) -> Result<()> {
    let options = import_options(args.delimiter, args.input_encoding.as_deref())?;
    let bytes = read_input(&args.input)?;
    let name = file_name(&args.input);
    let extension = upload::file_extension(&name);
    info!(
        "Importing '{}' into '{}' with delimiter '{}'",
        args.input.display(),
        args.database.display(),
        io_utils::printable_delimiter(options.delimiter)
    );

    let mut conn = SqliteConnection::open(&args.database)
        .with_context(|| format!("Opening database {:?}", args.database))?;
    let uploader = Uploader::new(options, Logger::global("sheet2sql"));
    let cancel = CancelFlag::new();
    let summary = match &args.table {
        Some(table) => uploader.upload_as(&mut conn, table, &bytes, extension, &cancel),
        None => uploader.upload_file(&mut conn, &name, &bytes, extension, &cancel),
    }
    .with_context(|| format!("Importing {:?}", args.input))?;

    println!(
        "Imported {} row(s) into table '{}' ({} column(s))",
        summary.rows,
        summary.schema.name,
        summary.schema.column_count()
    );
    Ok(())
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let options = import_options(args.delimiter, args.input_encoding.as_deref())?;
    let bytes = read_input(&args.input)?;
    let name = file_name(&args.input);
    info!(
        "Probing '{}' with delimiter '{}'",
        args.input.display(),
        io_utils::printable_delimiter(options.delimiter)
    );

    let uploader = Uploader::new(options, Logger::global("sheet2sql"));
    let schema = uploader
        .inspect(&name, &bytes, upload::file_extension(&name), &CancelFlag::new())
        .with_context(|| format!("Inferring schema from {:?}", args.input))?;

    table::print_schema(&schema);
    if args.sql {
        println!("{}", sql::create_table_statement(&schema));
    }
    if let Some(meta) = &args.meta {
        schema
            .save(meta)
            .with_context(|| format!("Writing schema to {meta:?}"))?;
        info!(
            "Inferred schema for {} column(s) written to {:?}",
            schema.column_count(),
            meta
        );
    }
    Ok(())
}

fn import_options(delimiter: Option<u8>, encoding: Option<&str>) -> Result<ImportOptions> {
    Ok(ImportOptions {
        delimiter: delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER),
        encoding: io_utils::resolve_encoding(encoding)?,
    })
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Reading input file {path:?}"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
