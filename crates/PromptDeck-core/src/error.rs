use thiserror::Error;

/// Every failure the core reports. The `Display` text is the single human-readable
/// message surfaced to the operator.
#[derive(Debug, Error)]
pub enum PromptDeckError {
    /// A request was rejected before any state was written.
    #[error("{0}")]
    Validation(String),

    /// The referenced model, node or input does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The backend could not be reached or answered with an error.
    #[error("{0}")]
    Upstream(String),

    /// Reading or writing a local document failed.
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A local document or backend response was not valid JSON for its shape.
    #[error("{context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PromptDeckError {
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn parse(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for PromptDeckError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PromptDeckError>;
