use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures raised by the tokenization and matching engine.
///
/// `Construction` and `Pattern` point at a bad hand-authored shape,
/// `Consistency` at a bug in the engine's own assumptions. Neither is
/// meant to be recovered from inside a batch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid token configuration: {0}")]
    Construction(String),

    #[error("invalid regex pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("consistency check failed: {0}")]
    Consistency(String),

    #[error("unsupported shape correction: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Usage(String),
}

impl EngineError {
    pub fn pattern(pattern: &str, source: regex::Error) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}
