//! Remote reconciliation.
//!
//! ## Upload
//!
//! 1. List remote projects.
//! 2. Create the project if it is absent.
//! 3. Warn when the version is uncommitted (advisory only).
//! 4. Upload the archive, replacing the previous content.
//!
//! ## Schedules
//!
//! Each declared `(flow, cron)` is compared with the server's current
//! schedule by exact string comparison:
//!
//! | current          | action                          |
//! |------------------|---------------------------------|
//! | none             | schedule                        |
//! | different cron   | unschedule, then schedule       |
//! | same cron        | nothing                         |
//!
//! Schedules on the server that are not declared are left alone.

use std::path::Path;

use flowpack_core::{BuildVersion, ScheduleEntry};
use flowpack_remote::Session;

use crate::error::{io_err, DeployError};

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// What [`ensure_and_upload`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    /// The project did not exist and was created.
    pub created: bool,
    /// The uploaded version was dirty or unversioned.
    pub uncommitted: bool,
}

/// Make sure `project` exists on the server, then upload `archive` to it.
pub fn ensure_and_upload(
    session: &dyn Session,
    project: &str,
    description: &str,
    archive: &Path,
    version: &BuildVersion,
) -> Result<UploadOutcome, DeployError> {
    let remote_err = |source| DeployError::Remote {
        project: project.to_owned(),
        source,
    };

    let existing = session.list_projects().map_err(remote_err)?;
    let created = !existing.contains(project);
    if created {
        tracing::info!("creating project {project}");
        session
            .create_project(project, description)
            .map_err(remote_err)?;
    }

    let uncommitted = version.is_uncommitted();
    if uncommitted {
        tracing::warn!("uploading uncommitted version {version} of {project}");
    }

    let bytes = std::fs::read(archive).map_err(|e| io_err(archive, e))?;
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{project}-{version}.zip"));
    tracing::info!("uploading {file_name} to {project}");
    session
        .upload_project(project, &file_name, &bytes)
        .map_err(remote_err)?;

    Ok(UploadOutcome {
        created,
        uncommitted,
    })
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// What reconciling one flow did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleAction {
    /// No schedule existed; one was created.
    Created { flow: String, cron: String },
    /// A schedule with another expression was removed and recreated.
    Replaced {
        flow: String,
        from: Option<String>,
        to: String,
    },
    /// The server already had the declared expression.
    Unchanged { flow: String, cron: String },
}

impl ScheduleAction {
    pub fn flow(&self) -> &str {
        match self {
            ScheduleAction::Created { flow, .. }
            | ScheduleAction::Replaced { flow, .. }
            | ScheduleAction::Unchanged { flow, .. } => flow,
        }
    }
}

/// Bring one flow's schedule in line with `entry`.
///
/// A "no schedule" answer from the server means the flow is unscheduled;
/// every other failure is returned.
pub fn reconcile_schedule(
    session: &dyn Session,
    project: &str,
    entry: &ScheduleEntry,
) -> Result<ScheduleAction, DeployError> {
    let ScheduleEntry { flow, cron } = entry;
    let schedule_err = |source| DeployError::Schedule {
        project: project.to_owned(),
        flow: flow.clone(),
        source,
    };

    let current = match session.get_schedule(project, flow) {
        Ok(schedule) => Some(schedule.cron_expression),
        Err(err) if err.is_not_found() => {
            tracing::debug!("no current schedule for {project}/{flow}: {err}");
            None
        }
        Err(err) => return Err(schedule_err(err)),
    };

    match current {
        None => {
            tracing::info!("scheduling {flow} with {cron}");
            session
                .schedule_cron(project, flow, cron)
                .map_err(schedule_err)?;
            Ok(ScheduleAction::Created {
                flow: flow.clone(),
                cron: cron.clone(),
            })
        }
        Some(Some(existing)) if existing == *cron => {
            tracing::info!("{flow} already scheduled with {cron}");
            Ok(ScheduleAction::Unchanged {
                flow: flow.clone(),
                cron: cron.clone(),
            })
        }
        Some(existing) => {
            tracing::info!(
                "rescheduling {flow}: {} -> {cron}",
                existing.as_deref().unwrap_or("(none)")
            );
            session.unschedule(project, flow).map_err(schedule_err)?;
            session
                .schedule_cron(project, flow, cron)
                .map_err(schedule_err)?;
            Ok(ScheduleAction::Replaced {
                flow: flow.clone(),
                from: existing,
                to: cron.clone(),
            })
        }
    }
}

/// Reconcile every entry in declaration order, stopping at the first error.
pub fn reconcile_schedules(
    session: &dyn Session,
    project: &str,
    entries: &[ScheduleEntry],
) -> Result<Vec<ScheduleAction>, DeployError> {
    entries
        .iter()
        .map(|entry| reconcile_schedule(session, project, entry))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
