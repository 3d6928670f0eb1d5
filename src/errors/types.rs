use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlagbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Submission store error: {0}")]
    Database(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Render timeout: {0}")]
    Timeout(String),

    #[error("Score notification error: {0}")]
    Notify(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
