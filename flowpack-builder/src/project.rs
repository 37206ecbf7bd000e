//! In-memory project model.
//!
//! A [`Project`] collects everything that ends up in the archive: merged
//! properties, one entry per job, and attached files keyed by their
//! archive-relative target (`./relative/path`). Attaching two files to the
//! same target keeps the later one.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use walkdir::WalkDir;

use flowpack_core::{BuildVersion, JobDefinition, ProjectName, Properties, PropertyScope};

use crate::dependencies::collect_entry_points;
use crate::error::BuildError;

/// Prefix that replaces an attached directory's own path in archive targets.
pub const ROOT_MARKER: &str = "./";

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A project ready to be written as an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: ProjectName,
    pub version: BuildVersion,
    pub properties: Properties,
    jobs: IndexMap<String, JobDefinition>,
    files: IndexMap<String, PathBuf>,
}

impl Project {
    pub fn new(name: ProjectName, version: BuildVersion) -> Self {
        Self {
            name,
            version,
            properties: Properties::new(),
            jobs: IndexMap::new(),
            files: IndexMap::new(),
        }
    }

    /// `<name>-<version>`; stem of the archive file name.
    pub fn versioned_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// `<name>-<version>.zip`
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.versioned_name())
    }

    pub fn add_job(&mut self, name: impl Into<String>, job: JobDefinition) {
        let name = name.into();
        tracing::info!("adding job {name}");
        self.jobs.insert(name, job);
    }

    /// Attach `source` at archive target `target`, replacing any earlier file
    /// with the same target.
    pub fn add_file(&mut self, source: impl Into<PathBuf>, target: impl Into<String>) {
        let (source, target) = (source.into(), target.into());
        tracing::debug!("adding file {} as {target}", source.display());
        self.files.insert(target, source);
    }

    /// Attach every regular file under `dir`, targets relative to `dir`.
    ///
    /// Archives this project wrote earlier (`<name>-*.zip` and their `.tmp`
    /// siblings) are skipped, so an output dir inside the project dir is not
    /// packed into the next build. Returns the number of files attached.
    pub fn attach_dir(&mut self, dir: &Path) -> Result<usize, BuildError> {
        let mut count = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if self.is_own_archive(entry.path()) {
                tracing::debug!("skipping earlier archive {}", entry.path().display());
                continue;
            }
            let target = archive_target(dir, entry.path());
            self.add_file(entry.path(), target);
            count += 1;
        }
        Ok(count)
    }

    /// `<name>-<anything>.zip` or `<name>-<anything>.zip.tmp`.
    fn is_own_archive(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let prefix = format!("{}-", self.name);
        file_name.starts_with(&prefix)
            && (file_name.ends_with(".zip") || file_name.ends_with(".zip.tmp"))
    }

    pub fn jobs(&self) -> &IndexMap<String, JobDefinition> {
        &self.jobs
    }

    /// Attached files as `(target, source)` in attachment order.
    pub fn files(&self) -> &IndexMap<String, PathBuf> {
        &self.files
    }

    /// Jobs nothing else depends on.
    pub fn entry_points(&self) -> Vec<String> {
        collect_entry_points(&self.jobs)
    }
}

/// `file` relative to `root`, rewritten as `./a/b` with `/` separators.
pub fn archive_target(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("{ROOT_MARKER}{}", parts.join("/"))
}

// ---------------------------------------------------------------------------
// build_project
// ---------------------------------------------------------------------------

/// Inputs for [`build_project`].
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub name: ProjectName,
    pub version: BuildVersion,
    /// Property layers in override order (global, project, extra).
    pub properties: PropertyScope,
    pub jobs: &'a IndexMap<String, JobDefinition>,
    /// Directories whose files are attached, in order; later targets win.
    pub attach_dirs: Vec<PathBuf>,
}

/// Assemble the project model. Purely local; nothing is written.
pub fn build_project(request: BuildRequest<'_>) -> Result<Project, BuildError> {
    tracing::info!(
        "building workflow {}, version: {}",
        request.name,
        request.version
    );

    let mut project = Project::new(request.name, request.version);
    project.properties = request.properties.merge();

    for (name, job) in request.jobs {
        project.add_job(name.clone(), job.clone());
    }

    for flow in project.entry_points() {
        tracing::info!("created workflow {flow}");
    }

    for dir in &request.attach_dirs {
        let attached = project.attach_dir(dir)?;
        tracing::debug!("attached {attached} files from {}", dir.display());
    }

    Ok(project)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
