use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PullError {
    /// Malformed grid row or page-range string.
    #[error("{0}")]
    Format(String),

    #[error("not found: {}", .0.display())]
    MissingResource(PathBuf),

    /// File exists but is not a PDF we can parse.
    #[error("cannot read PDF {}: {reason}", .path.display())]
    UnreadableResource { path: PathBuf, reason: String },

    #[error("page(s) {} out of range (document has {total} pages)", .tokens.join(", "))]
    OutOfRange { tokens: Vec<String>, total: u32 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled: {0}")]
    UserCancelled(String),
}

impl PullError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PullError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<csv::Error> for PullError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => PullError::io("grid I/O failed", source),
            _ => PullError::Format(format!("malformed grid file: {}", message)),
        }
    }
}

impl From<serde_json::Error> for PullError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            PullError::io("JSON I/O failed", err.into())
        } else {
            PullError::Format(format!("malformed JSON: {}", err))
        }
    }
}

pub type Result<T> = std::result::Result<T, PullError>;
