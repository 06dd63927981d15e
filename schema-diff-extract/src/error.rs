use thiserror::Error;

/// The error taxonomy extractors raise. `Transient` is retried by the
/// framework up to three times; the rest propagate immediately. This
/// mirrors the `Configuration | TransientDB | PermanentDB` split of the
/// overall error-handling design, scoped to what an extractor itself can
/// distinguish.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transient database error (attempt {attempt}): {message}")]
    Transient { message: String, attempt: u32 },

    #[error("permanent database error: {0}")]
    Permanent(String),

    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ExtractError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Transient { .. })
    }
}
