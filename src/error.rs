//! Error types for the financial planning advisor

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Pipeline Stage Errors
    // =============================

    #[error("Data collection error: {0}")]
    DataCollection(String),

    #[error("Expense analysis error: {0}")]
    Analysis(String),

    #[error("Advice generation error: {0}")]
    AdviceGeneration(String),

    #[error("Forecast error: {0}")]
    Forecast(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    // =============================
    // Collaborator / Input Errors
    // =============================

    #[error("Narrative generation error: {0}")]
    Narrative(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdvisorError {
    /// The message without the category prefix added by `Display`.
    pub fn detail(&self) -> String {
        match self {
            AdvisorError::DataCollection(msg)
            | AdvisorError::Analysis(msg)
            | AdvisorError::AdviceGeneration(msg)
            | AdvisorError::Forecast(msg)
            | AdvisorError::Synthesis(msg)
            | AdvisorError::Narrative(msg)
            | AdvisorError::InsufficientData(msg)
            | AdvisorError::InvalidInput(msg)
            | AdvisorError::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
