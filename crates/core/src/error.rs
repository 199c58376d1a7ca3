use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorsError {
    /// An options or origin delegate failed while producing its value.
    #[error("cors delegate failed: {0}")]
    Delegate(#[from] anyhow::Error),
    #[error("invalid origin pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unsupported value for `{field}`: {reason}")]
    ConfigType { field: &'static str, reason: String },
    #[error("failed loading settings: {0}")]
    Load(#[from] config::ConfigError),
}

impl CorsError {
    pub fn delegate(msg: impl std::fmt::Display) -> Self {
        CorsError::Delegate(anyhow::anyhow!("{msg}"))
    }
}

pub type CorsResult<T> = Result<T, CorsError>;
