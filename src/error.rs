use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{message}")]
    Usage { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Downloads directory not found: {message}")]
    DownloadsDirNotFound { message: String },

    #[error("Download failed: {url}")]
    DownloadFailed { url: String },

    #[error("Extraction failed: {name}: {source}")]
    Extraction {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("{count} archive entries could not be synchronized")]
    EntryFailures { count: usize },
}

impl SyncError {
    pub fn usage<S: Into<String>>(message: S) -> Self {
        SyncError::Usage {
            message: message.into(),
        }
    }

    pub fn downloads_dir_not_found<S: Into<String>>(message: S) -> Self {
        SyncError::DownloadsDirNotFound {
            message: message.into(),
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, SyncError::Usage { .. })
    }
}
