use std::path::PathBuf;

use thiserror::Error;

/// Failures of scrap operations that callers are expected to handle.
#[derive(Debug, Error)]
pub enum ScrapError {
    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Refusing to touch the working root or one of its ancestors: {}", .0.display())]
    IsRoot(PathBuf),

    #[error("Already inside the scrap directory: {}", .0.display())]
    InsideScrap(PathBuf),

    #[error("Not in the scrap directory: {0}")]
    EntryNotFound(String),

    #[error("Destination already exists: {} (use --force to overwrite)", .0.display())]
    DestinationExists(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Index(#[from] anyhow::Error),
}

impl ScrapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapError>;
