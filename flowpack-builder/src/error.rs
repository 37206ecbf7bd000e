//! Error types for flowpack-builder.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while assembling a project archive.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory enumeration failed while collecting attachments.
    #[error("failed to enumerate files: {0}")]
    Walk(#[from] walkdir::Error),

    /// The zip writer rejected an entry or failed to finish the archive.
    #[error("archive error at {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Convenience constructor for [`BuildError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.into(),
        source,
    }
}
