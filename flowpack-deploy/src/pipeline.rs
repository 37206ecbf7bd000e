//! Per-project pipeline and batch runner.
//!
//! ## `process_project`
//!
//! 1. Load the definition.
//! 2. Build the project model (global → project → extra properties).
//! 3. Write `<output-dir>/<name>-<version>.zip`.
//! 4. With a session: ensure-and-upload, reconcile schedules, then remove
//!    the archive. Without one the archive is the result.
//!
//! The archive is removed only after every remote step succeeded; on any
//! failure it stays on disk for inspection.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use flowpack_builder::{build_project, write_archive, Archive, BuildRequest};
use flowpack_core::{
    definition::{load_definition, load_project_dir, project_name},
    BuildVersion, ProjectName, Properties, PropertyScope,
};
use flowpack_remote::Session;

use crate::error::{io_err, DeployError};
use crate::reconcile::{ensure_and_upload, reconcile_schedules, ScheduleAction, UploadOutcome};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Where a project's definition comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectInput {
    /// A directory holding `project.yml`; all of its files are attached.
    Directory(PathBuf),
    /// A standalone definition file; only the extra files dir is attached.
    DefinitionFile(PathBuf),
}

impl ProjectInput {
    pub fn path(&self) -> &Path {
        match self {
            ProjectInput::Directory(path) | ProjectInput::DefinitionFile(path) => path,
        }
    }
}

/// Settings shared by every project in a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub global_properties: Properties,
    pub extra_properties: Properties,
    pub version: BuildVersion,
    /// Attached after the project's own files.
    pub files_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of one successfully processed project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReport {
    pub name: ProjectName,
    pub version: BuildVersion,
    pub archive: Archive,
    pub entry_points: Vec<String>,
    /// `None` for local builds.
    pub upload: Option<UploadOutcome>,
    pub schedules: Vec<ScheduleAction>,
    /// `false` once the archive has been uploaded and removed.
    pub archive_retained: bool,
}

// ---------------------------------------------------------------------------
// process_project
// ---------------------------------------------------------------------------

/// Build one project and, when `session` is present, deploy it.
pub fn process_project(
    session: Option<&dyn Session>,
    input: &ProjectInput,
    options: &PipelineOptions,
) -> Result<ProjectReport, DeployError> {
    let (definition, mut attach_dirs) = match input {
        ProjectInput::Directory(dir) => (load_project_dir(dir)?, vec![dir.clone()]),
        ProjectInput::DefinitionFile(path) => (load_definition(path)?, Vec::new()),
    };
    attach_dirs.extend(options.files_dir.iter().cloned());

    let name = project_name(&definition, input.path());
    let scope = PropertyScope::new()
        .with_layer(options.global_properties.clone())
        .with_layer(definition.properties.clone())
        .with_layer(options.extra_properties.clone());

    let project = build_project(BuildRequest {
        name: name.clone(),
        version: options.version.clone(),
        properties: scope,
        jobs: &definition.jobs,
        attach_dirs,
    })?;
    let entry_points = project.entry_points();
    let archive = write_archive(&project, &options.output_dir)?;

    let mut report = ProjectReport {
        name,
        version: options.version.clone(),
        archive,
        entry_points,
        upload: None,
        schedules: Vec::new(),
        archive_retained: true,
    };

    let Some(session) = session else {
        tracing::info!("local build, keeping {}", report.archive.path.display());
        return Ok(report);
    };

    let remote_name = report.name.to_string();
    let description = definition.description_or(&report.name).to_owned();
    let upload = ensure_and_upload(
        session,
        &remote_name,
        &description,
        &report.archive.path,
        &report.version,
    )?;
    report.upload = Some(upload);
    report.schedules =
        reconcile_schedules(session, &remote_name, &definition.schedule_entries())?;

    std::fs::remove_file(&report.archive.path).map_err(|e| io_err(&report.archive.path, e))?;
    tracing::debug!("removed {}", report.archive.path.display());
    report.archive_retained = false;
    Ok(report)
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Immediate subdirectories of `root`, sorted, hidden ones skipped.
pub fn discover_projects(root: &Path) -> Result<Vec<ProjectInput>, DeployError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| io_err(root, e.into()))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_dir() {
            inputs.push(ProjectInput::Directory(entry.into_path()));
        }
    }
    Ok(inputs)
}

/// What to do when a project in a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Log the failure and go on with the next project.
    #[default]
    ContinueOnError,
    /// Stop after the first failure.
    FailFast,
}

/// Result of one project in a batch.
#[derive(Debug)]
pub struct ProjectOutcome {
    pub input: ProjectInput,
    pub result: Result<ProjectReport, DeployError>,
}

impl ProjectOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Process `inputs` one after another.
///
/// Under [`BatchPolicy::FailFast`] the returned list ends with the first
/// failure; projects after it are not attempted.
pub fn run_batch(
    session: Option<&dyn Session>,
    inputs: &[ProjectInput],
    options: &PipelineOptions,
    policy: BatchPolicy,
) -> Vec<ProjectOutcome> {
    let mut outcomes = Vec::with_capacity(inputs.len());
    for input in inputs {
        let result = process_project(session, input, options);
        let failed = result.is_err();
        if let Err(err) = &result {
            tracing::error!("{}: {err}", input.path().display());
        }
        outcomes.push(ProjectOutcome {
            input: input.clone(),
            result,
        });
        if failed && policy == BatchPolicy::FailFast {
            tracing::warn!("stopping after first failure");
            break;
        }
    }
    outcomes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn options(output_dir: &Path) -> PipelineOptions {
        PipelineOptions {
            global_properties: Properties::new(),
            extra_properties: Properties::new(),
            version: BuildVersion::new("v1"),
            files_dir: None,
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn write_project(root: &Path, name: &str, yaml: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("project.yml"), yaml).unwrap();
        dir
    }

    #[test]
    fn discover_sorts_and_skips_hidden_and_files() {
        let root = TempDir::new().unwrap();
        for dir in ["zeta", "alpha", ".git", "mid"] {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("global.yml"), "").unwrap();

        let found: Vec<_> = discover_projects(root.path())
            .unwrap()
            .iter()
            .map(|i| i.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn discover_missing_root_is_io_error() {
        let root = TempDir::new().unwrap();
        let err = discover_projects(&root.path().join("absent")).unwrap_err();
        assert!(matches!(err, DeployError::Io { .. }));
    }

    #[test]
    fn local_build_keeps_archive() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let dir = write_project(root.path(), "etl", "jobs:\n  A:\n    type: command\n");

        let report =
            process_project(None, &ProjectInput::Directory(dir), &options(out.path())).unwrap();

        assert_eq!(report.name, ProjectName::from("etl"));
        assert_eq!(report.archive.path, out.path().join("etl-v1.zip"));
        assert!(report.archive.path.exists());
        assert!(report.archive_retained);
        assert!(report.upload.is_none());
        assert_eq!(report.entry_points, ["A"]);
    }

    #[test]
    fn rebuild_into_project_dir_does_not_pack_previous_archive() {
        let root = TempDir::new().unwrap();
        let dir = write_project(root.path(), "etl", "jobs:\n  A:\n    type: command\n");
        let input = ProjectInput::Directory(dir.clone());

        let first = process_project(None, &input, &options(&dir)).unwrap();
        assert!(dir.join("etl-v1.zip").exists());
        let second = process_project(None, &input, &options(&dir)).unwrap();

        assert_eq!(first.archive.entries, 2, "A.job and project.yml");
        assert_eq!(second.archive.entries, 2, "A.job and project.yml");
        assert_eq!(first.archive.sha256, second.archive.sha256);
    }

    #[test]
    fn job_file_in_project_dir_is_written_once() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let dir = write_project(root.path(), "etl", "jobs:\n  A:\n    type: command\n");
        fs::write(dir.join("A.job"), "type=stale\n").unwrap();

        let report =
            process_project(None, &ProjectInput::Directory(dir), &options(out.path())).unwrap();

        let mut zip =
            zip::ZipArchive::new(fs::File::open(&report.archive.path).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["A.job", "project.yml"]);
    }

    #[test]
    fn declared_name_overrides_directory() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let dir = write_project(root.path(), "etl", "name: loads\n");
        let report =
            process_project(None, &ProjectInput::Directory(dir), &options(out.path())).unwrap();
        assert_eq!(report.archive.path, out.path().join("loads-v1.zip"));
    }

    #[test]
    fn definition_file_attaches_only_files_dir() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let files = TempDir::new().unwrap();
        fs::write(files.path().join("run.sh"), "echo").unwrap();
        fs::write(root.path().join("stray.txt"), "not attached").unwrap();
        let definition = root.path().join("reports.yml");
        fs::write(&definition, "jobs:\n  A: {type: command}\n").unwrap();

        let mut opts = options(out.path());
        opts.files_dir = Some(files.path().to_path_buf());
        let report = process_project(None, &ProjectInput::DefinitionFile(definition), &opts)
            .unwrap();

        assert_eq!(report.name, ProjectName::from("reports"));
        assert_eq!(report.archive.entries, 2, "A.job and run.sh");
    }

    #[test]
    fn missing_definition_is_missing_file() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let dir = root.path().join("empty");
        fs::create_dir_all(&dir).unwrap();

        let err = process_project(None, &ProjectInput::Directory(dir), &options(out.path()))
            .unwrap_err();
        assert!(err.is_missing_file(), "got: {err}");
    }

    #[rstest]
    #[case(BatchPolicy::ContinueOnError, 3)]
    #[case(BatchPolicy::FailFast, 2)]
    fn batch_policy_controls_what_runs_after_a_failure(
        #[case] policy: BatchPolicy,
        #[case] attempted: usize,
    ) {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_project(root.path(), "a", "jobs:\n  A: {}\n");
        write_project(root.path(), "b", "properties: [not, a, mapping]\n");
        write_project(root.path(), "c", "jobs:\n  C: {}\n");

        let inputs = discover_projects(root.path()).unwrap();
        let outcomes = run_batch(None, &inputs, &options(out.path()), policy);

        assert_eq!(outcomes.len(), attempted);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        if attempted == 3 {
            assert!(outcomes[2].is_ok());
            assert!(out.path().join("c-v1.zip").exists());
        }
    }

    #[test]
    fn default_policy_continues() {
        assert_eq!(BatchPolicy::default(), BatchPolicy::ContinueOnError);
    }
}
