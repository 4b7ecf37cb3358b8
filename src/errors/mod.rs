use thiserror::Error;

/// Errors raised while preparing or asserting repository test data
#[derive(Error, Debug)]
pub enum DataPrepError {
    #[error("Test configuration error: {message}")]
    Configuration { message: String },

    #[error("Could not create {resource}. Request response ({status}): {summary}")]
    CreationFailed { resource: String, status: u16, summary: String },

    #[error("Could not delete {resource}. Request response ({status}): {summary}")]
    DeletionFailed { resource: String, status: u16, summary: String },

    #[error("Could not update {resource}. Request response ({status}): {summary}")]
    UpdateFailed { resource: String, status: u16, summary: String },

    #[error("Storage conflict on '{path}': {details}")]
    StorageConflict { path: String, details: String },

    #[error("Assertion failed: {message}")]
    AssertionFailure { message: String },

    #[error("Timed out waiting for '{path}' after {attempts} attempts")]
    PollTimedOut { path: String, attempts: u32 },

    #[error("Legacy binding error: {message}")]
    Binding { message: String },

    #[error("Unexpected response from server: {message}")]
    UnexpectedResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DataPrepError>;

impl DataPrepError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailure { message: message.into() }
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding { message: message.into() }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse { message: message.into() }
    }

    /// Stable code for reporting and for matching in test harnesses
    pub fn error_code(&self) -> &'static str {
        match self {
            DataPrepError::Configuration { .. } => "CONFIGURATION_ERROR",
            DataPrepError::CreationFailed { .. } => "CREATION_FAILED",
            DataPrepError::DeletionFailed { .. } => "DELETION_FAILED",
            DataPrepError::UpdateFailed { .. } => "UPDATE_FAILED",
            DataPrepError::StorageConflict { .. } => "STORAGE_CONFLICT",
            DataPrepError::AssertionFailure { .. } => "ASSERTION_FAILURE",
            DataPrepError::PollTimedOut { .. } => "POLL_TIMED_OUT",
            DataPrepError::Binding { .. } => "BINDING_ERROR",
            DataPrepError::UnexpectedResponse { .. } => "UNEXPECTED_RESPONSE",
            DataPrepError::Http(_) => "HTTP_ERROR",
            DataPrepError::Json(_) => "JSON_ERROR",
            DataPrepError::Io(_) => "IO_ERROR",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DataPrepError::Configuration { .. })
    }

    pub fn is_storage_conflict(&self) -> bool {
        matches!(self, DataPrepError::StorageConflict { .. })
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, DataPrepError::AssertionFailure { .. })
    }
}
