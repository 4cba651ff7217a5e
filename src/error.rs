use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemTilesError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot derive upload job from tile file name: {0}")]
    InvalidTileName(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload of {file_name} rejected with status {status}")]
    UploadStatus { status: u16, file_name: String },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl DemTilesError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DemTilesError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DemTilesError>;
