//! Error types shared by every import stage.
//!
//! [`ImportError`] is the closed set of failures the pipeline can report.
//! Each variant that wraps a lower-level error also carries the operation tag
//! (`"materializer.save_data"` and so on) of the stage that produced it.

use thiserror::Error;

use crate::store::StoreError;

/// How a failure should be presented to whoever asked for the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is unacceptable (wrong file type).
    ClientRejection,
    /// The file was accepted but its contents cannot form a table.
    MalformedInput,
    /// Anything else. Details stay in the logs.
    Internal,
}

impl ErrorClass {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorClass::ClientRejection => 2,
            ErrorClass::MalformedInput => 3,
            ErrorClass::Internal => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("Failed to decode text with encoding {0}")]
    Encoding(&'static str),

    #[error("Workbook part '{0}' is missing")]
    MissingPart(String),

    #[error("Invalid cell reference '{0}'")]
    CellReference(String),

    #[error("Shared string index {0} is out of range")]
    SharedString(usize),

    #[error("Unknown XML entity '{0}'")]
    Entity(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported extension '{extension}' (expected .csv or .xlsx)")]
    UnsupportedExtension { extension: String },

    #[error("file is empty or has no data rows")]
    EmptyData,

    #[error("no columns")]
    NoColumns,

    #[error("{op}: import canceled")]
    Canceled { op: &'static str },

    #[error("{op}: {source}")]
    Decode {
        op: &'static str,
        #[source]
        source: DecodeError,
    },

    #[error("{op}: {detail}: {source}")]
    Store {
        op: &'static str,
        detail: String,
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    pub(crate) fn decode(op: &'static str, source: impl Into<DecodeError>) -> Self {
        ImportError::Decode {
            op,
            source: source.into(),
        }
    }

    pub(crate) fn store(op: &'static str, detail: impl Into<String>, source: StoreError) -> Self {
        ImportError::Store {
            op,
            detail: detail.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ImportError::UnsupportedExtension { .. } => ErrorClass::ClientRejection,
            ImportError::EmptyData | ImportError::NoColumns => ErrorClass::MalformedInput,
            ImportError::Canceled { .. }
            | ImportError::Decode { .. }
            | ImportError::Store { .. } => ErrorClass::Internal,
        }
    }

    /// Message that is safe to show to the requester. Internal failures are
    /// reduced to a fixed string so store or parser text never leaks.
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::ClientRejection | ErrorClass::MalformedInput => self.to_string(),
            ErrorClass::Internal => "internal error".to_string(),
        }
    }
}
