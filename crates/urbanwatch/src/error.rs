use thiserror::Error;

#[derive(Error, Debug)]
pub enum UrbanError {
    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Location unavailable: {0}")]
    Location(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Draft session is closed")]
    DraftClosed,
}

impl From<confique::Error> for UrbanError {
    fn from(err: confique::Error) -> Self {
        UrbanError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UrbanError>;
