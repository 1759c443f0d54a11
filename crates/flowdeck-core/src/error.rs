use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowdeckError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Catalog errors
    #[error("Catalog request failed: {endpoint}: {message}")]
    Catalog { endpoint: String, message: String },

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Workflow not found in store: {0}")]
    WorkflowNotFound(String),

    #[error("Download failed: {file}: {message}")]
    Download { file: String, message: String },

    // Editor errors
    #[error("Invalid drag payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid workflow document: {0}")]
    InvalidDocument(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowdeckError>;
