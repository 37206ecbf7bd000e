//! Definition loading.
//!
//! # Layout
//!
//! ```text
//! <projects-root>/
//!   global.yml            (optional property overlay shared by all projects)
//!   <project>/
//!     project.yml         (definition: name, properties, jobs, schedule, description)
//!     ...                 (every other file is attached to the archive)
//! ```
//!
//! A missing definition is an error; a missing overlay is an empty mapping.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::error::DefinitionError;
use crate::types::{deserialize_properties, ProjectDefinition, ProjectName, Properties};

/// File name of the definition inside a project directory.
pub const PROJECT_FILE: &str = "project.yml";

/// File name of the shared property overlay inside the root directory.
pub const GLOBAL_PROPERTIES_FILE: &str = "global.yml";

/// Which overlay is being loaded; only affects how its absence is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Global,
    Extra,
}

/// `<dir>/project.yml`; pure, no I/O.
pub fn project_file_in(dir: &Path) -> PathBuf {
    dir.join(PROJECT_FILE)
}

/// `<root>/global.yml`; pure, no I/O.
pub fn global_properties_in(root: &Path) -> PathBuf {
    root.join(GLOBAL_PROPERTIES_FILE)
}

/// Load a definition file.
///
/// Returns `DefinitionError::MissingFile` if absent and
/// `DefinitionError::Malformed` (with path + line context) if not a valid definition.
/// An empty document is an empty definition.
pub fn load_definition(path: &Path) -> Result<ProjectDefinition, DefinitionError> {
    read_yaml(path)
}

/// Load `<dir>/project.yml`.
pub fn load_project_dir(dir: &Path) -> Result<ProjectDefinition, DefinitionError> {
    load_definition(&project_file_in(dir))
}

/// Load a flat property mapping that must exist.
pub fn load_properties(path: &Path) -> Result<Properties, DefinitionError> {
    let PropertiesFile(properties) = read_yaml(path)?;
    Ok(properties)
}

/// Load an optional property overlay; absence yields an empty mapping.
pub fn load_overlay(path: &Path, overlay: Overlay) -> Result<Properties, DefinitionError> {
    match load_properties(path) {
        Err(DefinitionError::MissingFile { path }) => {
            match overlay {
                Overlay::Global => {
                    tracing::info!("global property file {} doesn't exist", path.display())
                }
                Overlay::Extra => {
                    tracing::warn!("extra property file {} doesn't exist", path.display())
                }
            }
            Ok(Properties::new())
        }
        other => other,
    }
}

/// Name declared in the definition, else the basename of `source`
/// (the project directory, or the definition file without its extension).
pub fn project_name(definition: &ProjectDefinition, source: &Path) -> ProjectName {
    if let Some(name) = definition.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return ProjectName::from(name);
    }
    let base = if source.is_dir() {
        source.file_name()
    } else {
        source.file_stem()
    };
    let base = base
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    ProjectName::from(base)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PropertiesFile(Properties);

impl<'de> serde::Deserialize<'de> for PropertiesFile {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_properties(deserializer).map(PropertiesFile)
    }
}

fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, DefinitionError> {
    if !path.exists() {
        return Err(DefinitionError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |source| DefinitionError::Malformed {
        path: path.to_path_buf(),
        source,
    };
    // Blank or comment-only documents parse as null.
    if serde_yaml::from_str::<Value>(&contents).map_err(malformed)?.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&contents).map_err(malformed)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
