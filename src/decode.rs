//! Turning uploaded bytes into a grid of raw string cells.
//!
//! Decoders do not interpret values. Row 0 of the grid is whatever the file's
//! first row was; the analyzer treats it as the header.

use encoding_rs::{Encoding, UTF_8};

use crate::{
    error::ImportError,
    io_utils,
    logger::Logger,
    xlsx,
};

pub type Grid = Vec<Vec<String>>;

const OP_CSV: &str = "decode.csv";
const OP_XLSX: &str = "decode.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Accepts `.csv`/`.xlsx` with or without the leading dot, in any case.
    pub fn from_extension(extension: &str) -> Result<Self, ImportError> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(ImportError::UnsupportedExtension {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Xlsx => ".xlsx",
        }
    }
}

/// Settings that only matter to delimited text.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Integration seam between file bytes and the analyzer.
pub trait TabularDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Grid, ImportError>;
}

#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
    encoding: &'static Encoding,
    log: Logger,
}

impl CsvDecoder {
    pub fn new(options: ImportOptions, log: Logger) -> Self {
        Self {
            delimiter: options.delimiter,
            encoding: options.encoding,
            log,
        }
    }
}

impl TabularDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Grid, ImportError> {
        let text = io_utils::decode_bytes(bytes, self.encoding)
            .map_err(|err| ImportError::decode(OP_CSV, err))?;
        let mut reader = io_utils::open_csv_reader(text.as_bytes(), self.delimiter);
        let mut rows = Grid::new();
        for record in reader.records() {
            let record = record.map_err(|err| ImportError::decode(OP_CSV, err))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        self.log.debug(format_args!(
            "{OP_CSV}: parsed {} row(s) with delimiter '{}'",
            rows.len(),
            io_utils::printable_delimiter(self.delimiter)
        ));
        Ok(rows)
    }
}

#[derive(Debug, Clone)]
pub struct XlsxDecoder {
    log: Logger,
}

impl XlsxDecoder {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }
}

impl TabularDecoder for XlsxDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Grid, ImportError> {
        let rows = match xlsx::read_first_sheet(bytes) {
            Ok(Some(rows)) => rows,
            Ok(None) => return Err(ImportError::EmptyData),
            Err(err) => return Err(ImportError::decode(OP_XLSX, err)),
        };
        self.log.debug(format_args!("{OP_XLSX}: parsed {} row(s)", rows.len()));
        Ok(rows)
    }
}

/// Decoder for a format, configured from the import options.
pub fn decoder_for(
    format: FileFormat,
    options: ImportOptions,
    log: &Logger,
) -> Box<dyn TabularDecoder> {
    let log = log.with_target("sheet2sql::decode");
    match format {
        FileFormat::Csv => Box::new(CsvDecoder::new(options, log)),
        FileFormat::Xlsx => Box::new(XlsxDecoder::new(log)),
    }
}
