//! Error types for flowpack-remote.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from talking to the remote scheduler.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server reports that the requested object does not exist.
    #[error("{action}: not found: {message}")]
    NotFound {
        action: &'static str,
        message: String,
    },

    /// The server rejected the request (permission, validation, HTTP status).
    #[error("{action} failed: {message}")]
    Api {
        action: &'static str,
        message: String,
    },

    /// The request never got a response (DNS, connect, TLS, timeout).
    #[error("{action}: transport error: {message}")]
    Transport {
        action: &'static str,
        message: String,
    },

    /// The response body was not the JSON shape expected.
    #[error("{action}: unexpected response: {message}")]
    Decode {
        action: &'static str,
        message: String,
    },

    #[error("invalid server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The alias is not listed in the remotes file.
    #[error("remote alias '{alias}' not defined in {path}")]
    UnknownAlias { alias: String, path: PathBuf },

    /// Remotes file parse error; includes file path and line context from serde_yaml.
    #[error("failed to parse remotes file at {path}: {source}")]
    AliasParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.flowpack/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("no user name for {url}; pass --user or put it in the URL")]
    MissingUser { url: String },

    #[error("no password for {url}; set ${var}")]
    MissingPassword { url: String, var: String },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Actions whose "missing" answers mean the object is absent rather than
/// that the request was refused.
const LOOKUP_ACTIONS: &[&str] = &["fetch schedule", "fetch project flows"];

/// Classify a server-side error message.
///
/// For lookup actions, messages saying the object is missing or the lookup is
/// invalid become [`RemoteError::NotFound`]. Everything else, including any
/// rejection of a create, upload or schedule call, is [`RemoteError::Api`].
pub(crate) fn classify(action: &'static str, message: impl Into<String>) -> RemoteError {
    const NOT_FOUND_MARKERS: &[&str] = &[
        "not found",
        "doesn't exist",
        "does not exist",
        "not scheduled",
        "no schedule",
        "invalid",
    ];
    let message = message.into();
    let lowered = message.to_lowercase();
    let missing = NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m));
    if missing && LOOKUP_ACTIONS.contains(&action) {
        RemoteError::NotFound { action, message }
    } else {
        RemoteError::Api { action, message }
    }
}
