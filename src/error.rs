use thiserror::Error;

#[derive(Error, Debug)]
pub enum SukashiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Undecodable media: {0}")]
    Undecodable(String),

    #[error("Track creation failed: {0}")]
    TrackCreation(String),

    #[error("Watermark image load failed: {0}")]
    ImageLoad(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Export was cancelled")]
    ExportCancelled,

    #[error("Media processing error: {0}")]
    Media(String),
}

pub type Result<T> = std::result::Result<T, SukashiError>;
