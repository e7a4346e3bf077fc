use kipart_sexpr::ParseError;
use thiserror::Error;

pub type Result<T, E = KipartError> = std::result::Result<T, E>;

/// Everything that can stop symbol generation, library merging or reading.
#[derive(Debug, Error)]
pub enum KipartError {
    #[error("invalid part name {0:?}")]
    InvalidPartName(String),

    #[error("symbols already present in the library: {}", .0.join(", "))]
    DuplicateSymbolConflict(Vec<String>),

    #[error("part {part}: row {row}: {reason}")]
    MalformedRow {
        part: String,
        row: usize,
        reason: String,
    },

    #[error("part {part}: missing pin number on row {row}")]
    MissingPinNumber { part: String, row: usize },

    #[error("unsupported file extension: {0}")]
    UnsupportedFileExtension(String),

    #[error("part {part}: missing required '{column}' column")]
    MissingColumn { part: String, column: String },

    #[error("part {part}: unrecognized column '{column}'")]
    UnknownColumn { part: String, column: String },

    #[error("part {part}: invalid property '{label}'")]
    InvalidProperty { part: String, label: String },

    #[error("unrecognized {kind} '{value}'")]
    InvalidValue { kind: &'static str, value: String },

    #[error("no pins defined for part {0}")]
    NoPins(String),

    #[error("no valid symbols found")]
    NoSymbols,

    #[error("not a KiCad symbol library: {0}")]
    NotALibrary(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KipartError {
    pub(crate) fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
        KipartError::InvalidValue {
            kind,
            value: value.into(),
        }
    }

    pub(crate) fn malformed(part: &str, row: usize, reason: impl Into<String>) -> Self {
        KipartError::MalformedRow {
            part: part.to_string(),
            row,
            reason: reason.into(),
        }
    }
}
