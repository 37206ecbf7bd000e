//! Remote session capability.

use std::collections::BTreeSet;

use crate::error::RemoteError;

/// A flow's current schedule on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub id: Option<String>,
    /// `None` for schedules that are not cron based.
    pub cron_expression: Option<String>,
}

/// Operations the reconciler needs from an open session.
///
/// `get_schedule` reports a flow without a schedule as
/// [`RemoteError::NotFound`]; every other failure is a real error.
pub trait Session {
    fn list_projects(&self) -> Result<BTreeSet<String>, RemoteError>;

    fn create_project(&self, name: &str, description: &str) -> Result<(), RemoteError>;

    /// Upload `archive` (zip bytes) as the new content of project `name`.
    fn upload_project(&self, name: &str, file_name: &str, archive: &[u8])
        -> Result<(), RemoteError>;

    fn get_schedule(&self, project: &str, flow: &str) -> Result<Schedule, RemoteError>;

    fn schedule_cron(&self, project: &str, flow: &str, cron: &str) -> Result<(), RemoteError>;

    fn unschedule(&self, project: &str, flow: &str) -> Result<(), RemoteError>;
}
