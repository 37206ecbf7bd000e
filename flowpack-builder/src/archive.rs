//! Archive writer.
//!
//! ## Layout
//!
//! | entry                | content                                         |
//! |----------------------|-------------------------------------------------|
//! | `project.properties` | merged properties, `key=value`, sorted by key   |
//! | `<job>.job`          | one per job, flattened `key=value` lines        |
//! | `<target>`           | each attached file, leading `./` stripped       |
//!
//! Entry names are unique. An attached file whose name matches a generated
//! manifest (a stale `A.job` next to a declared job `A`) is left out; the
//! manifest built from the definition is what the archive carries.
//!
//! Every entry carries the same fixed timestamp and permissions, so identical
//! inputs produce byte-identical archives. The archive is written to a `.tmp`
//! sibling and renamed into place.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_yaml::Value;
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use flowpack_core::{types::scalar_text, JobDefinition, Properties};

use crate::error::{io_err, BuildError};
use crate::project::{Project, ROOT_MARKER};

/// Entry name of the merged property file.
pub const PROPERTIES_ENTRY: &str = "project.properties";

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    /// Hex SHA-256 of the archive bytes.
    pub sha256: String,
    pub entries: usize,
}

/// Write `project` to `<output_dir>/<name>-<version>.zip`, replacing any
/// existing file.
pub fn write_archive(project: &Project, output_dir: &Path) -> Result<Archive, BuildError> {
    std::fs::create_dir_all(output_dir).map_err(|e| io_err(output_dir, e))?;
    let path = output_dir.join(project.archive_file_name());
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));

    let entries = match write_entries(project, &tmp) {
        Ok(entries) => entries,
        Err(err) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(err);
        }
    };
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }

    let sha256 = digest_file(&path)?;
    tracing::info!("wrote {} ({entries} entries, sha256 {sha256})", path.display());
    Ok(Archive {
        path,
        sha256,
        entries,
    })
}

/// Content of one archive entry.
#[derive(Debug)]
enum EntrySource<'a> {
    Manifest(String),
    File(&'a Path),
}

/// Entry name to content, in archive order, one entry per name.
fn archive_entries(project: &Project) -> IndexMap<String, EntrySource<'_>> {
    let mut entries = IndexMap::new();
    if !project.properties.is_empty() {
        entries.insert(
            PROPERTIES_ENTRY.to_owned(),
            EntrySource::Manifest(properties_manifest(&project.properties)),
        );
    }
    for (name, job) in project.jobs() {
        entries.insert(
            format!("{name}.job"),
            EntrySource::Manifest(job_manifest(job)),
        );
    }
    for (target, source) in project.files() {
        let name = target.strip_prefix(ROOT_MARKER).unwrap_or(target);
        if entries.contains_key(name) {
            tracing::debug!("skipping {}, {name} is generated", source.display());
            continue;
        }
        entries.insert(name.to_owned(), EntrySource::File(source.as_path()));
    }
    entries
}

fn write_entries(project: &Project, tmp: &Path) -> Result<usize, BuildError> {
    let file = File::create(tmp).map_err(|e| io_err(tmp, e))?;
    let mut zip = ZipWriter::new(file);
    let zip_err = |source| BuildError::Archive {
        path: tmp.to_path_buf(),
        source,
    };

    let entries = archive_entries(project);
    for (name, source) in &entries {
        let contents = match source {
            EntrySource::Manifest(text) => text.as_bytes().to_vec(),
            EntrySource::File(path) => std::fs::read(path).map_err(|e| io_err(*path, e))?,
        };
        zip.start_file(name.as_str(), entry_options())
            .map_err(zip_err)?;
        zip.write_all(&contents).map_err(|e| io_err(tmp, e))?;
    }

    let file = zip.finish().map_err(zip_err)?;
    file.sync_all().map_err(|e| io_err(tmp, e))?;
    Ok(entries.len())
}

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

fn digest_file(path: &Path) -> Result<String, BuildError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| io_err(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

/// `key=value` lines in key order.
pub fn properties_manifest(properties: &Properties) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}

/// `key=value` lines for a job; nested mappings flatten to dotted keys and
/// sequences join with `,`.
pub fn job_manifest(job: &JobDefinition) -> String {
    let mut lines = Vec::new();
    for (key, value) in job.iter() {
        flatten(&key_text(key), value, &mut lines);
    }
    lines
        .into_iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Mapping(map) => {
            for (key, nested) in map {
                flatten(&format!("{prefix}.{}", key_text(key)), nested, out);
            }
        }
        Value::Sequence(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_text).collect();
            out.push((prefix.to_owned(), joined.join(",")));
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        scalar => out.push((prefix.to_owned(), scalar_text(scalar).unwrap_or_default())),
    }
}

fn key_text(key: &Value) -> String {
    scalar_text(key).unwrap_or_else(|| format!("{key:?}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
