//! End-to-end import of one uploaded file: name, decode, analyze, create,
//! insert.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    analyzer::{CancelFlag, SchemaAnalyzer},
    decode::{self, FileFormat, Grid, ImportOptions},
    error::ImportError,
    logger::Logger,
    materializer::TableMaterializer,
    schema::TableSchema,
    store::Connection,
};

pub const DEFAULT_TABLE_NAME: &str = "imported_table";

const OP_UPLOAD: &str = "upload.upload_file";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static pattern compiles"));

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub schema: TableSchema,
    /// Data rows inserted, header excluded.
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct Uploader {
    options: ImportOptions,
    analyzer: SchemaAnalyzer,
    materializer: TableMaterializer,
    log: Logger,
}

impl Uploader {
    pub fn new(options: ImportOptions, log: Logger) -> Self {
        Self {
            options,
            analyzer: SchemaAnalyzer::new(log.with_target("sheet2sql::analyzer")),
            materializer: TableMaterializer::new(log.with_target("sheet2sql::materializer")),
            log: log.with_target("sheet2sql::upload"),
        }
    }

    /// Import `bytes` as a new table named after the uploaded file
    /// `filename`.
    ///
    /// The extension is checked before any byte is decoded. The table is
    /// created even when the file holds only a header; the insert step is
    /// skipped in that case.
    pub fn upload_file<C: Connection>(
        &self,
        conn: &mut C,
        filename: &str,
        bytes: &[u8],
        extension: &str,
        cancel: &CancelFlag,
    ) -> Result<ImportSummary, ImportError> {
        self.import(conn, sanitize_table_name(filename), bytes, extension, cancel)
    }

    /// Same as [`Uploader::upload_file`], but `table` is a table name chosen
    /// by the caller. It is sanitized without dropping anything after a dot.
    pub fn upload_as<C: Connection>(
        &self,
        conn: &mut C,
        table: &str,
        bytes: &[u8],
        extension: &str,
        cancel: &CancelFlag,
    ) -> Result<ImportSummary, ImportError> {
        self.import(conn, sanitize_identifier(table), bytes, extension, cancel)
    }

    /// Schema the file would produce, without touching any store.
    pub fn inspect(
        &self,
        filename: &str,
        bytes: &[u8],
        extension: &str,
        cancel: &CancelFlag,
    ) -> Result<TableSchema, ImportError> {
        self.decode_and_analyze(&sanitize_table_name(filename), bytes, extension, cancel)
            .map(|(schema, _)| schema)
    }

    fn import<C: Connection>(
        &self,
        conn: &mut C,
        name: String,
        bytes: &[u8],
        extension: &str,
        cancel: &CancelFlag,
    ) -> Result<ImportSummary, ImportError> {
        let (schema, grid) = self.decode_and_analyze(&name, bytes, extension, cancel)?;

        self.materializer.create(conn, &schema)?;
        let data = grid.get(1..).unwrap_or_default();
        if !data.is_empty() {
            self.materializer.save_data(conn, &schema, data)?;
        }

        self.log.info(format_args!(
            "{OP_UPLOAD}: file processed successfully table={} columns={} rows={}",
            schema.name,
            schema.column_count(),
            data.len()
        ));
        Ok(ImportSummary {
            schema,
            rows: data.len(),
        })
    }

    fn decode_and_analyze(
        &self,
        name: &str,
        bytes: &[u8],
        extension: &str,
        cancel: &CancelFlag,
    ) -> Result<(TableSchema, Grid), ImportError> {
        let format = FileFormat::from_extension(extension)?;
        self.log.debug(format_args!(
            "{OP_UPLOAD}: decoding {} byte(s) as {} into table '{name}'",
            bytes.len(),
            format.extension()
        ));
        let grid = decode::decoder_for(format, self.options, &self.log).decode(bytes)?;
        let schema = self.analyzer.analyze(name, &grid, cancel)?;
        Ok((schema, grid))
    }
}

/// Table name derived from an uploaded file name: the extension is dropped
/// and the stem goes through [`sanitize_identifier`].
pub fn sanitize_table_name(filename: &str) -> String {
    let stem = filename
        .strip_suffix(file_extension(filename))
        .unwrap_or(filename);
    sanitize_identifier(stem)
}

/// Each run of characters outside `[a-zA-Z0-9]` becomes a single `_`,
/// surrounding underscores are trimmed and the result is lower-cased.
/// Nothing left means [`DEFAULT_TABLE_NAME`].
pub fn sanitize_identifier(name: &str) -> String {
    let replaced = NON_ALPHANUMERIC.replace_all(name, "_");
    let name = replaced.trim_matches('_').to_lowercase();
    if name.is_empty() {
        DEFAULT_TABLE_NAME.to_string()
    } else {
        name
    }
}

/// Extension of the last path element including its dot, or `""`.
pub fn file_extension(filename: &str) -> &str {
    let start = filename.rfind(['/', '\\']).map_or(0, |idx| idx + 1);
    match filename[start..].rfind('.') {
        Some(dot) => &filename[start + dot..],
        None => "",
    }
}
