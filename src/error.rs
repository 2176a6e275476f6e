use crate::period::Period;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid period range: {from} is after {to}")]
    InvalidRange { from: Period, to: Period },

    #[error("Empty selection: {0}")]
    EmptySelection(String),

    #[error("Rows out of order at index {index}: input must be sorted by entity and period")]
    UnsortedInput { index: usize },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Fetch task failed: {0}")]
    Task(String),

    #[error("Report cancelled")]
    Cancelled,

    #[error("Failed to generate {report} report")]
    ReportFailed {
        report: &'static str,
        #[source]
        source: Box<ReportError>,
    },
}

/// Coarse classification used to decide retries and the status reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad request input. Never retried.
    Validation,
    /// The store failed. Retried by the fetch layer when configured.
    Upstream,
    /// Broken precondition or task failure inside the engine.
    Internal,
    /// The caller abandoned the request.
    Cancelled,
}

impl ReportError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReportError::InvalidRange { .. }
            | ReportError::EmptySelection(_)
            | ReportError::InvalidArgument(_)
            | ReportError::NotFound(_) => ErrorClass::Validation,
            ReportError::DuckDb(_) | ReportError::Io(_) => ErrorClass::Upstream,
            ReportError::UnsortedInput { .. } | ReportError::Json(_) | ReportError::Task(_) => {
                ErrorClass::Internal
            }
            ReportError::Cancelled => ErrorClass::Cancelled,
            ReportError::ReportFailed { source, .. } => source.class(),
        }
    }

    /// HTTP status equivalent for the routing layer.
    pub fn http_status(&self) -> u16 {
        if let ReportError::NotFound(_) = self.root() {
            return 404;
        }
        match self.class() {
            ErrorClass::Validation => 400,
            ErrorClass::Cancelled => 499,
            ErrorClass::Upstream | ErrorClass::Internal => 500,
        }
    }

    /// The innermost error, looking through [`ReportError::ReportFailed`].
    pub fn root(&self) -> &ReportError {
        match self {
            ReportError::ReportFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.class() == ErrorClass::Validation
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
