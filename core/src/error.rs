use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Fatal configuration problem, raised before any generation runs.
    #[error("Invalid configuration: `{field}` must be {expected}")]
    InvalidConfig {
        field: &'static str,
        expected: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned: {what}")]
    LockPoisoned { what: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn invalid(field: &'static str, expected: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            expected: expected.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
