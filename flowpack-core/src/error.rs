//! Error types for flowpack-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading definitions and property overlays.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// A required definition file does not exist.
    #[error("definition not found at {path}")]
    MissingFile { path: PathBuf },

    /// The file exists but is not a valid definition; includes serde_yaml's line context.
    #[error("failed to parse {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Underlying I/O failure, annotated with the path being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DefinitionError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            DefinitionError::MissingFile { path }
            | DefinitionError::Malformed { path, .. }
            | DefinitionError::Io { path, .. } => path,
        }
    }
}
