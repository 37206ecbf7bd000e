//! flowpack core library: definition types, loading, property merging.
//!
//! - [`types`]: newtypes and the parsed [`ProjectDefinition`]
//! - [`definition`]: load `project.yml` and property overlays
//! - [`properties`]: layered property merge
//! - [`error`]: [`DefinitionError`]

pub mod definition;
pub mod error;
pub mod properties;
pub mod types;

pub use error::DefinitionError;
pub use properties::PropertyScope;
pub use types::{
    BuildVersion, JobDefinition, ProjectDefinition, ProjectName, Properties, ScheduleEntry,
};
