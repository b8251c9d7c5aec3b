use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, XlqError>;

/// Errors that can occur inside the workbook access engine.
///
/// Every variant carries enough context to produce a single-line
/// diagnostic; front-ends map these onto exit codes or tool-error
/// envelopes without inspecting the message text.
#[derive(Debug, Error)]
pub enum XlqError {
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("invalid cell range: {0}")]
    InvalidRange(String),

    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("sheet already exists: {0}")]
    SheetAlreadyExists(String),

    #[error("cannot delete the last sheet")]
    CannotDeleteLastSheet,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("file too large: {size} bytes exceeds limit of {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("access denied: path outside allowed directories: {0}")]
    PathOutsideAllowed(String),

    #[error("write denied: sensitive path: {0}")]
    WriteDeniedSensitive(String),

    #[error("write denied: {0}")]
    WriteDeniedUnwritable(String),

    #[error("row limit exceeded: {count} exceeds maximum of {limit}")]
    CountLimitExceeded { count: usize, limit: usize },

    #[error("cell limit exceeded: {count} exceeds maximum of {limit}")]
    CellLimitExceeded { count: usize, limit: usize },

    #[error("response too large: {size} bytes exceeds limit of {limit}")]
    ResponseTooLarge { size: usize, limit: usize },

    #[error("cannot resolve path: {0}")]
    ResolutionFailure(String),

    /// Opaque pass-through from the workbook parser, tagged with the
    /// operation that failed.
    #[error("{context}: {message}")]
    Parser { context: String, message: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl XlqError {
    /// Wrap a parser-level failure with the name of the failing operation.
    pub fn parser(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        XlqError::Parser {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
