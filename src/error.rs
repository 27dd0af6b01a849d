use std::path::PathBuf;

/// Broad class of a failure, used by callers that only care about the kind of
/// problem and not its exact wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed command text, unknown command name or malformed condition.
    Parse,
    /// Unknown table or column name.
    Reference,
    /// Wrong arity or a non-integer where an integer is required.
    Argument,
    /// Operator-specific shape mismatch or arithmetic failure.
    Precondition,
    /// Failure in the delimited-file layer.
    Io,
    /// A reserved command that the engine does not provide.
    NotImplemented,
}

/// Every recoverable failure the engine can report.
///
/// None of these are fatal: a command that fails leaves the namespace exactly as
/// it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("invalid condition {0:?}: expected <operand><op><operand> with op in >=, <=, !=, >, <, =")]
    InvalidCondition(String),

    #[error("table {0:?} does not exist")]
    TableNotFound(String),
    #[error("column {column:?} does not exist in table {table:?}")]
    ColumnNotFound { table: String, column: String },

    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("{command} expects {expected} argument(s), found {found}")]
    Arity {
        command: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("cannot access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} line {line}: {message}")]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{0} is not implemented")]
    NotImplemented(String),
}

impl Error {
    pub(crate) fn column_not_found(table: &str, column: &str) -> Self {
        Self::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Returns the class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse(_) | Self::UnknownCommand(_) | Self::InvalidCondition(_) => {
                ErrorCategory::Parse
            }
            Self::TableNotFound(_) | Self::ColumnNotFound { .. } => ErrorCategory::Reference,
            Self::Argument(_) | Self::Arity { .. } => ErrorCategory::Argument,
            Self::Precondition(_) | Self::DivisionByZero(_) => ErrorCategory::Precondition,
            Self::Io { .. } | Self::Format { .. } => ErrorCategory::Io,
            Self::NotImplemented(_) => ErrorCategory::NotImplemented,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
