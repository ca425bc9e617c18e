use thiserror::Error;

pub type Result<T> = std::result::Result<T, RankingError>;

/// Errors raised at the boundaries of the ranking core: snapshot loaders,
/// stores and the batch job. The ranking pass itself never returns one of
/// these; it degrades to neutral values instead.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model parse failed: {0}")]
    ModelParse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for RankingError {
    fn from(err: sqlx::Error) -> Self {
        RankingError::Store(err.to_string())
    }
}

impl From<std::io::Error> for RankingError {
    fn from(err: std::io::Error) -> Self {
        RankingError::ModelLoad(err.to_string())
    }
}

impl From<serde_json::Error> for RankingError {
    fn from(err: serde_json::Error) -> Self {
        RankingError::ModelParse(err.to_string())
    }
}

impl From<envy::Error> for RankingError {
    fn from(err: envy::Error) -> Self {
        RankingError::Config(err.to_string())
    }
}
