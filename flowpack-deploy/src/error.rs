//! Error types for flowpack-deploy.

use std::path::PathBuf;

use thiserror::Error;

use flowpack_builder::BuildError;
use flowpack_core::DefinitionError;
use flowpack_remote::RemoteError;

/// All errors that can end the processing of one project.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    /// Project listing, creation or upload failed.
    #[error("project {project}: {source}")]
    Remote {
        project: String,
        #[source]
        source: RemoteError,
    },

    /// Reconciling one flow's schedule failed.
    #[error("project {project}, flow {flow}: {source}")]
    Schedule {
        project: String,
        flow: String,
        #[source]
        source: RemoteError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// `true` when a required input file is absent.
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            DeployError::Definition(DefinitionError::MissingFile { .. })
        )
    }
}

/// Convenience constructor for [`DeployError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DeployError {
    DeployError::Io {
        path: path.into(),
        source,
    }
}
