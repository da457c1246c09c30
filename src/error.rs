use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to fetch meetings: {0}")]
    Upstream(String),
    #[error("Meetings do not fit in {page_max} pages even at {font_size}pt")]
    Overflow { page_max: u32, font_size: f32 },
    #[error("Layout error: {0}")]
    Layout(String),
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// HTTP-style status for the error payload. Configuration problems are the
    /// caller's fault, everything else is ours or upstream's.
    pub fn status(&self) -> u16 {
        match self {
            AppError::Config(_) => 400,
            AppError::Upstream(_) => 502,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    pub fn payload(&self) -> ErrorPayload {
        let error = if self.is_client_error() {
            "Invalid request"
        } else {
            "Failed to generate PDF"
        };
        ErrorPayload {
            error: error.to_string(),
            message: self.to_string(),
            status: self.status(),
        }
    }
}

/// JSON body emitted when generation fails before any document bytes are written.
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub message: String,
    pub status: u16,
}
