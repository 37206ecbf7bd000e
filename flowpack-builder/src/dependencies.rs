//! Flow entry points.
//!
//! A job's `dependencies` field names the jobs it runs after, either as a
//! comma-separated string or a YAML sequence. Jobs that no other job depends
//! on terminate a flow; the scheduler exposes them as schedulable flows.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_yaml::Value;

use flowpack_core::{types::scalar_text, JobDefinition};

/// Key holding a job's upstream job names.
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// Names listed in the job's `dependencies` field, whitespace-trimmed.
///
/// Absent or unusable values mean no dependencies.
pub fn job_dependencies(job: &JobDefinition) -> Vec<String> {
    let names: Vec<String> = match job.get(DEPENDENCIES_KEY) {
        Some(Value::String(list)) => list.split(',').map(str::to_owned).collect(),
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Jobs not depended upon by any other job, in declaration order.
pub fn collect_entry_points(jobs: &IndexMap<String, JobDefinition>) -> Vec<String> {
    let depended_upon: HashSet<String> = jobs.values().flat_map(job_dependencies).collect();
    jobs.keys()
        .filter(|name| !depended_upon.contains(*name))
        .cloned()
        .collect()
}
