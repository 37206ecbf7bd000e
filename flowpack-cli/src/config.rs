//! Command-line selections validated into closed variants.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use flowpack_builder::resolve_version;
use flowpack_core::definition::{global_properties_in, load_overlay, Overlay};
use flowpack_core::Properties;
use flowpack_deploy::{discover_projects, PipelineOptions, ProjectInput};
use flowpack_remote::{alias, AzkabanSession, RemoteTarget};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Which projects to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    SingleProject(PathBuf),
    Definition(PathBuf),
    ManyProjects(PathBuf),
}

impl Source {
    pub fn from_args(
        definition: Option<PathBuf>,
        project_dir: Option<PathBuf>,
        projects_root: Option<PathBuf>,
    ) -> Result<Self> {
        match (definition, project_dir, projects_root) {
            (Some(file), None, None) => Ok(Source::Definition(file)),
            (None, Some(dir), None) => Ok(Source::SingleProject(dir)),
            (None, None, Some(root)) => Ok(Source::ManyProjects(root)),
            _ => bail!("exactly one of --definition, --project-dir, --projects-root is required"),
        }
    }

    /// Directory holding `global.yml` and used for the git version lookup.
    pub fn root_dir(&self) -> PathBuf {
        match self {
            Source::ManyProjects(root) => root.clone(),
            Source::SingleProject(dir) => dir.join(".."),
            Source::Definition(file) => match file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    pub fn inputs(&self) -> Result<Vec<ProjectInput>> {
        match self {
            Source::SingleProject(dir) => Ok(vec![ProjectInput::Directory(dir.clone())]),
            Source::Definition(file) => Ok(vec![ProjectInput::DefinitionFile(file.clone())]),
            Source::ManyProjects(root) => {
                let inputs = discover_projects(root)
                    .with_context(|| format!("failed to list projects in {}", root.display()))?;
                if inputs.is_empty() {
                    tracing::warn!("no project directories under {}", root.display());
                }
                Ok(inputs)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Where the archives go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local,
    Alias(String),
    Url(String),
}

impl Target {
    pub fn from_args(alias: Option<String>, url: Option<String>, local: bool) -> Result<Self> {
        match (alias, url, local) {
            (None, None, true) => Ok(Target::Local),
            (Some(alias), None, false) => Ok(Target::Alias(alias)),
            (None, Some(url), false) => Ok(Target::Url(url)),
            _ => bail!("exactly one of --local, --azkaban-alias, --azkaban-url is required"),
        }
    }

    /// Resolve the server and log in; `None` for local builds.
    pub fn connect(
        &self,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Option<AzkabanSession>> {
        let target = match self {
            Target::Local => return Ok(None),
            Target::Alias(name) => RemoteTarget::from_alias(&alias::load_alias(name)?)?,
            Target::Url(url) => RemoteTarget::from_url(url)?,
        };
        let credentials = target.credentials(user, password)?;
        Ok(Some(AzkabanSession::login(&target, &credentials)?))
    }
}

// ---------------------------------------------------------------------------
// Pipeline options
// ---------------------------------------------------------------------------

/// Load the property overlays and settle the version for this run.
pub fn pipeline_options(
    source: &Source,
    global_props_file: Option<&Path>,
    extra_props_file: Option<&Path>,
    files_dir: Option<PathBuf>,
    build_version: Option<&str>,
    output_dir: PathBuf,
) -> Result<PipelineOptions> {
    let root = source.root_dir();

    let global_path = global_props_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| global_properties_in(&root));
    let global_properties = load_overlay(&global_path, Overlay::Global)?;
    let extra_properties = match extra_props_file {
        Some(path) => load_overlay(path, Overlay::Extra)?,
        None => Properties::new(),
    };

    let version = resolve_version(&root, build_version);
    tracing::debug!("build version {version} from {}", root.display());

    Ok(PipelineOptions {
        global_properties,
        extra_properties,
        version,
        files_dir,
        output_dir,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
