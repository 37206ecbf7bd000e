//! Domain types for flowpack project definitions.
//!
//! Property values are always strings once loaded; job definitions stay as
//! untyped YAML mappings so keys the remote scheduler understands (and we
//! don't) pass through untouched.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name under which a project is built and uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectName(pub String);

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Version token stamped on a build and its archive name.
///
/// One of: a caller-supplied string, `<short-revision>`,
/// `<short-revision>.dirty`, or [`BuildVersion::UNVERSIONED`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildVersion(String);

impl BuildVersion {
    /// Fallback when no version-control checkout encloses the project.
    pub const UNVERSIONED: &'static str = "unversioned";

    /// Marker appended (after a `.`) when the working tree has uncommitted changes.
    pub const DIRTY_SUFFIX: &'static str = "dirty";

    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn unversioned() -> Self {
        Self(Self::UNVERSIONED.to_owned())
    }

    /// `<short_id>` or `<short_id>.dirty`.
    pub fn from_revision(short_id: &str, dirty: bool) -> Self {
        if dirty {
            Self(format!("{short_id}.{}", Self::DIRTY_SUFFIX))
        } else {
            Self(short_id.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the build does not correspond to a committed revision.
    pub fn is_uncommitted(&self) -> bool {
        self.0.ends_with(Self::DIRTY_SUFFIX) || self.0 == Self::UNVERSIONED
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Properties and jobs
// ---------------------------------------------------------------------------

/// Flat string → string property mapping. Sorted so manifests are stable.
pub type Properties = BTreeMap<String, String>;

/// Opaque job configuration, interpreted only by the remote scheduler.
///
/// Key order is the order keys were declared in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobDefinition(pub Mapping);

impl JobDefinition {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.0.iter()
    }
}

/// A locally declared cron schedule for one flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub flow: String,
    pub cron: String,
}

/// Parsed `project.yml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub properties: Properties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: IndexMap<String, JobDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub schedule: IndexMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectDefinition {
    /// Declared schedules in declaration order.
    pub fn schedule_entries(&self) -> Vec<ScheduleEntry> {
        self.schedule
            .iter()
            .map(|(flow, cron)| ScheduleEntry {
                flow: flow.clone(),
                cron: cron.clone(),
            })
            .collect()
    }

    /// Description sent when the project is created remotely; falls back to the name.
    pub fn description_or<'a>(&'a self, name: &'a ProjectName) -> &'a str {
        self.description.as_deref().unwrap_or(&name.0)
    }
}

// ---------------------------------------------------------------------------
// YAML helpers
// ---------------------------------------------------------------------------

/// Textual form of a YAML scalar; `None` for sequences and mappings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts any scalar property value and renders it as text.
pub(crate) fn deserialize_properties<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Value>> = Option::deserialize(deserializer)?;
    let mut properties = Properties::new();
    for (key, value) in raw.unwrap_or_default() {
        let text = scalar_text(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("property '{key}' must be a scalar value"))
        })?;
        properties.insert(key, text);
    }
    Ok(properties)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
