//! # flowpack-builder
//!
//! Local assembly of a deployable project: version lookup, property and job
//! registration, file attachment, and the zip archive itself. Nothing in this
//! crate talks to the network.

pub mod archive;
pub mod dependencies;
pub mod error;
pub mod project;
pub mod version;

pub use archive::{write_archive, Archive};
pub use dependencies::{collect_entry_points, job_dependencies};
pub use error::BuildError;
pub use project::{build_project, BuildRequest, Project};
pub use version::{lookup_revision, resolve_version, Revision, RevisionLookup};
