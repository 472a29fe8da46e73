use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Chart rendering failed: {0}")]
    Render(String),

    #[error("Failed to serialize analytics output: {0}")]
    Serialization(#[from] serde_json::Error),
}
