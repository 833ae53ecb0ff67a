//! Table schema model and the column type lattice.
//!
//! A [`TableSchema`] is built once per import by the analyzer and consumed by
//! the materializer. Column types only ever widen along the lattice
//!
//! ```text
//! Unknown < Boolean ------------ < String
//! Unknown < Integer < Float ---- < String
//! ```
//!
//! Boolean and the numeric types are incomparable; String subsumes both.

use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    #[default]
    Unknown,
    Integer,
    Float,
    Boolean,
    String,
}

impl DataType {
    /// True when `other` can be reached from `self` by widening (or is `self`).
    pub fn subsumes(self, other: DataType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (DataType::String, _) => true,
            (_, DataType::Unknown) => true,
            (DataType::Float, DataType::Integer) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Unknown => "Unknown",
            DataType::Integer => "Integer",
            DataType::Float => "Float",
            DataType::Boolean => "Boolean",
            DataType::String => "String",
        }
    }

    /// SQL column type used when materializing the schema.
    pub fn sql_type(self) -> &'static str {
        match self {
            DataType::Integer => "BIGINT",
            DataType::Float => "NUMERIC",
            DataType::Boolean => "BOOLEAN",
            DataType::String | DataType::Unknown => "TEXT",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(DataType::Unknown),
            "integer" | "int" | "bigint" => Ok(DataType::Integer),
            "float" | "numeric" | "double" => Ok(DataType::Float),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "string" | "text" => Ok(DataType::String),
            other => Err(anyhow!("Unknown data type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Writing schema JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = serde_json::from_reader(reader).context("Parsing schema JSON")?;
        Ok(schema)
    }
}
