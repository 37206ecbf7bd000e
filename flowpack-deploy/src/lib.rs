//! # flowpack-deploy
//!
//! Ties loading, building and the remote session together.
//!
//! Call [`process_project`] to build (and optionally upload and schedule) a
//! single project, or [`run_batch`] to process every project under a root
//! directory one after another.

pub mod error;
pub mod pipeline;
pub mod reconcile;

pub use error::DeployError;
pub use pipeline::{
    discover_projects, process_project, run_batch, BatchPolicy, PipelineOptions, ProjectInput,
    ProjectOutcome, ProjectReport,
};
pub use reconcile::{
    ensure_and_upload, reconcile_schedule, reconcile_schedules, ScheduleAction, UploadOutcome,
};
