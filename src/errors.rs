// Error types for tridash

use crate::i18n::{Locale, Text};
use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum TridashError {
    // Errors talking to the platform API
    #[snafu(display("Request to the sensor platform failed"))]
    HttpError { source: reqwest::Error },
    #[snafu(display("Session expired, please log in again"))]
    Unauthorized,
    #[snafu(display("Server responded with {status}: {message}"))]
    ApiStatus { status: u16, message: String },
    #[snafu(display("Could not decode server response"))]
    ResponseDecodeError { source: serde_json::Error },
    #[snafu(display("Could not start background runtime"))]
    RuntimeError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Export errors
    #[snafu(display("Error writing export file"))]
    ExportIOError { source: io::Error },
    #[snafu(display("Error building Excel workbook"))]
    ExcelError {
        source: rust_xlsxwriter::XlsxError,
    },

    // User import errors
    #[snafu(display("Error reading user CSV file"))]
    CsvImportError { source: csv::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}

impl From<reqwest::Error> for TridashError {
    fn from(value: reqwest::Error) -> Self {
        TridashError::HttpError { source: value }
    }
}

impl TridashError {
    /// Localized message suitable for an inline error banner.
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            TridashError::HttpError { .. } | TridashError::RuntimeError { .. } => {
                locale.text(Text::NetworkError).to_string()
            }
            TridashError::Unauthorized => locale.text(Text::SessionExpired).to_string(),
            TridashError::ApiStatus { status, message } => {
                format!("{} ({}): {}", locale.text(Text::ServerError), status, message)
            }
            TridashError::ResponseDecodeError { .. } => {
                locale.text(Text::UnexpectedResponse).to_string()
            }
            TridashError::InvalidUserInput { field, reason } => {
                format!("{} {}: {}", locale.text(Text::InvalidInput), field, reason)
            }
            other => format!("{}: {}", locale.text(Text::LocalFileError), other),
        }
    }

    /// Whether the user can reasonably retry the failed action as is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TridashError::HttpError { .. }
                | TridashError::ApiStatus { .. }
                | TridashError::ResponseDecodeError { .. }
        )
    }
}
