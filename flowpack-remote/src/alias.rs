//! Named remotes and credentials.
//!
//! # Storage layout
//!
//! ```text
//! ~/.flowpack/
//!   remotes.yaml
//! ```
//!
//! ```yaml
//! aliases:
//!   prod:
//!     url: https://azkaban.example.com:8443
//!     user: deploy
//!     password_env: AZKABAN_PROD_PASSWORD
//! ```
//!
//! Every loader has two forms: `fn_at(home: &Path, …)` for an explicit home
//! and `fn(…)` which derives home from `dirs::home_dir()`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::RemoteError;

/// Environment variable read for the password when an alias names none.
pub const PASSWORD_ENV: &str = "AZKABAN_PASSWORD";

/// One entry of `remotes.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAlias {
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    /// Variable holding the password; defaults to [`PASSWORD_ENV`].
    #[serde(default)]
    pub password_env: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RemotesFile {
    #[serde(default)]
    aliases: BTreeMap<String, RemoteAlias>,
}

/// `<home>/.flowpack/remotes.yaml`; pure, no I/O.
pub fn remotes_path_at(home: &Path) -> PathBuf {
    home.join(".flowpack").join("remotes.yaml")
}

/// Look up `alias` in `<home>/.flowpack/remotes.yaml`.
pub fn load_alias_at(home: &Path, alias: &str) -> Result<RemoteAlias, RemoteError> {
    let path = remotes_path_at(home);
    let unknown = || RemoteError::UnknownAlias {
        alias: alias.to_owned(),
        path: path.clone(),
    };
    if !path.exists() {
        return Err(unknown());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| RemoteError::Io {
        path: path.clone(),
        source,
    })?;
    let file: Option<RemotesFile> =
        serde_yaml::from_str(&contents).map_err(|source| RemoteError::AliasParse {
            path: path.clone(),
            source,
        })?;
    file.unwrap_or_default()
        .aliases
        .remove(alias)
        .ok_or_else(unknown)
}

/// `load_alias_at` convenience wrapper.
pub fn load_alias(alias: &str) -> Result<RemoteAlias, RemoteError> {
    load_alias_at(&home()?, alias)
}

// ---------------------------------------------------------------------------
// Target + credentials
// ---------------------------------------------------------------------------

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// A server to connect to, before credentials are settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Base URL with any user-info removed.
    pub url: String,
    pub user: Option<String>,
    pub password_env: String,
}

impl RemoteTarget {
    /// Parse `url`; a user name embedded as `https://user@host` is lifted out.
    pub fn from_url(url: &str) -> Result<Self, RemoteError> {
        let mut parsed = Url::parse(url).map_err(|source| RemoteError::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;
        let user = Some(parsed.username().to_owned()).filter(|u| !u.is_empty());
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
        Ok(Self {
            url: parsed.as_str().trim_end_matches('/').to_owned(),
            user,
            password_env: PASSWORD_ENV.to_owned(),
        })
    }

    pub fn from_alias(alias: &RemoteAlias) -> Result<Self, RemoteError> {
        let mut target = Self::from_url(&alias.url)?;
        if alias.user.is_some() {
            target.user = alias.user.clone();
        }
        if let Some(var) = &alias.password_env {
            target.password_env = var.clone();
        }
        Ok(target)
    }

    /// Settle credentials: explicit values first, then the target's user and
    /// the password environment variable.
    pub fn credentials(
        &self,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Credentials, RemoteError> {
        let user = user
            .or_else(|| self.user.clone())
            .ok_or_else(|| RemoteError::MissingUser {
                url: self.url.clone(),
            })?;
        let password = password
            .or_else(|| std::env::var(&self.password_env).ok())
            .ok_or_else(|| RemoteError::MissingPassword {
                url: self.url.clone(),
                var: self.password_env.clone(),
            })?;
        Ok(Credentials { user, password })
    }
}

fn home() -> Result<PathBuf, RemoteError> {
    dirs::home_dir().ok_or(RemoteError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_remotes(home: &Path, yaml: &str) {
        let path = remotes_path_at(home);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, yaml).unwrap();
    }

    #[test]
    fn remotes_path_is_correct() {
        let home = TempDir::new().unwrap();
        assert!(remotes_path_at(home.path()).ends_with(".flowpack/remotes.yaml"));
    }

    #[test]
    fn load_known_alias() {
        let home = TempDir::new().unwrap();
        write_remotes(
            home.path(),
            "aliases:\n  prod:\n    url: https://az.example.com:8443\n    user: deploy\n",
        );
        let alias = load_alias_at(home.path(), "prod").expect("alias");
        assert_eq!(alias.url, "https://az.example.com:8443");
        assert_eq!(alias.user.as_deref(), Some("deploy"));
        assert!(alias.password_env.is_none());
    }

    #[test]
    fn unknown_alias_names_the_file() {
        let home = TempDir::new().unwrap();
        write_remotes(home.path(), "aliases:\n  prod:\n    url: http://x\n");
        let err = load_alias_at(home.path(), "staging").unwrap_err();
        assert!(matches!(err, RemoteError::UnknownAlias { .. }));
        assert!(err.to_string().contains("remotes.yaml"));
    }

    #[test]
    fn missing_remotes_file_is_unknown_alias() {
        let home = TempDir::new().unwrap();
        let err = load_alias_at(home.path(), "prod").unwrap_err();
        assert!(matches!(err, RemoteError::UnknownAlias { .. }));
    }

    #[test]
    fn corrupt_remotes_file_is_parse_error() {
        let home = TempDir::new().unwrap();
        write_remotes(home.path(), "aliases: [unclosed\n");
        let err = load_alias_at(home.path(), "prod").unwrap_err();
        assert!(matches!(err, RemoteError::AliasParse { .. }));
    }

    #[test]
    fn user_is_lifted_out_of_url() {
        let target = RemoteTarget::from_url("http://deploy@localhost:8081/").unwrap();
        assert_eq!(target.url, "http://localhost:8081");
        assert_eq!(target.user.as_deref(), Some("deploy"));
        assert_eq!(target.password_env, PASSWORD_ENV);
    }

    #[test]
    fn alias_settings_override_url_defaults() {
        let alias = RemoteAlias {
            url: "http://someone@localhost:8081".into(),
            user: Some("deploy".into()),
            password_env: Some("PROD_PW".into()),
        };
        let target = RemoteTarget::from_alias(&alias).unwrap();
        assert_eq!(target.user.as_deref(), Some("deploy"));
        assert_eq!(target.password_env, "PROD_PW");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = RemoteTarget::from_url("not a url").unwrap_err();
        assert!(matches!(err, RemoteError::InvalidUrl { .. }));
    }

    #[test]
    fn explicit_credentials_win() {
        let target = RemoteTarget::from_url("http://deploy@localhost:8081").unwrap();
        let creds = target
            .credentials(Some("admin".into()), Some("secret".into()))
            .unwrap();
        assert_eq!(creds.user, "admin");
        assert_eq!(creds.password, "secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn missing_user_is_an_error() {
        let target = RemoteTarget::from_url("http://localhost:8081").unwrap();
        let err = target.credentials(None, Some("pw".into())).unwrap_err();
        assert!(matches!(err, RemoteError::MissingUser { .. }));
    }

    #[test]
    fn missing_password_names_the_variable() {
        let mut target = RemoteTarget::from_url("http://deploy@localhost:8081").unwrap();
        target.password_env = "FLOWPACK_TEST_UNSET_PASSWORD_VAR".into();
        let err = target.credentials(None, None).unwrap_err();
        assert!(err.to_string().contains("FLOWPACK_TEST_UNSET_PASSWORD_VAR"));
    }
}
