use thiserror::Error;

/// Errors raised while parsing an agent configuration document.
///
/// These are reported before any resolution or execution begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("configuration root must be a JSON object")]
    NotAnObject,

    #[error("configuration must contain a 'cards' array")]
    MissingCards,

    #[error("card at index {index} is not a JSON object")]
    CardNotAnObject { index: usize },

    #[error("card at index {index} is missing '{field}'")]
    MissingCardField { index: usize, field: &'static str },

    #[error("duplicate card id '{0}'")]
    DuplicateCardId(String),

    #[error("no JSON object found in model output")]
    NoJsonPayload,
}

/// Errors from repository operations (used by trait definitions in cardflow-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(String),
}
