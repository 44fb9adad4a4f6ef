use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Unknown object type: {0}")]
    UnknownObjectType(String),

    /// The search backend could not be reached or timed out.
    #[error("Search backend unreachable: {0}")]
    Transport(String),

    /// The search backend answered with a non-success status.
    #[error("Search backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Dataset row {row}: {message}")]
    Dataset { row: u64, message: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the search backend itself, as opposed to bad input.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Backend { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
