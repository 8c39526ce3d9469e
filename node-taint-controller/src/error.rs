use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("node {0} not found")]
    NotFound(String),

    #[error("failed to read node {node}: {reason}")]
    TransientRead { node: String, reason: String },

    #[error("node {0} was modified concurrently")]
    Conflict(String),

    #[error("failed to patch node {node}: {reason}")]
    Patch { node: String, reason: String },

    #[error("trigger adapter failed: {0}")]
    Adapter(String),

    #[error("invalid taint policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid controller settings: {0}")]
    InvalidSettings(String),
}

impl Error {
    pub fn metric_label(&self) -> String {
        match self {
            Error::NotFound(_) => "not_found",
            Error::TransientRead { .. } => "transient_read",
            Error::Conflict(_) => "conflict",
            Error::Patch { .. } => "patch",
            Error::Adapter(_) => "adapter",
            Error::InvalidPolicy(_) => "invalid_policy",
            Error::InvalidSettings(_) => "invalid_settings",
        }
        .into()
    }

    /// Errors the next trigger firing is expected to recover from.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransientRead { .. } | Error::Conflict(_) | Error::Patch { .. }
        )
    }
}
