use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SasayakiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing Google Gemini API key in config file: {}", config_path.display())]
    MissingApiKey { config_path: PathBuf },

    #[error("Command failed: {command}\n{output}")]
    Process { command: String, output: String },

    #[error("Download error: {0}")]
    Download(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, SasayakiError>;
