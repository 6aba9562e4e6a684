use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum StatementError {
    /// Reference sheet or run options are unusable. Raised before any PDF is opened.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Failed to open document '{file}': {message}")]
    DocumentOpen { file: String, message: String },

    #[error("Processing of '{file}' exceeded {seconds}s")]
    TaskTimeout { file: String, seconds: u64 },

    #[error("Failed to render output for unit '{unit}': {message}")]
    Rendering { unit: String, message: String },

    #[error("Packaging error: {message}")]
    Packaging { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StatementError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn document_open(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentOpen {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn task_timeout(file: impl Into<String>, seconds: u64) -> Self {
        Self::TaskTimeout {
            file: file.into(),
            seconds,
        }
    }

    pub fn rendering(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rendering {
            unit: unit.into(),
            message: message.into(),
        }
    }

    pub fn packaging(message: impl Into<String>) -> Self {
        Self::Packaging {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Failures scoped to one source file; subject to the failure policy.
    pub fn is_file_scoped(&self) -> bool {
        matches!(self, Self::DocumentOpen { .. } | Self::TaskTimeout { .. })
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::DocumentOpen { .. } => "DOCUMENT_OPEN_ERROR",
            Self::TaskTimeout { .. } => "TASK_TIMEOUT",
            Self::Rendering { .. } => "RENDERING_ERROR",
            Self::Packaging { .. } => "PACKAGING_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Configuration { .. } => 400,
            Self::Validation { .. } => 400,
            Self::DocumentOpen { .. } => 422,
            Self::TaskTimeout { .. } => 504,
            Self::Rendering { .. } => 500,
            Self::Packaging { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }
}

pub type StatementResult<T> = Result<T, StatementError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<StatementError> for ErrorResponse {
    fn from(error: StatementError) -> Self {
        let details = match &error {
            StatementError::DocumentOpen { file, .. } | StatementError::TaskTimeout { file, .. } => {
                Some(serde_json::json!({ "file": file }))
            }
            StatementError::Rendering { unit, .. } => Some(serde_json::json!({ "unit": unit })),
            _ => None,
        };

        Self {
            error: error.error_code().to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

// Conversion from common error types
impl From<validator::ValidationErrors> for StatementError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::validation("options", crate::validation::format_validation_errors(&errors))
    }
}

impl From<serde_json::Error> for StatementError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<std::io::Error> for StatementError {
    fn from(error: std::io::Error) -> Self {
        Self::internal(error.to_string())
    }
}

impl From<zip::result::ZipError> for StatementError {
    fn from(error: zip::result::ZipError) -> Self {
        Self::packaging(error.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for StatementError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Self::packaging(format!("Failed to write extract workbook: {}", error))
    }
}
