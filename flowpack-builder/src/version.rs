//! Build version lookup.
//!
//! The nearest enclosing git checkout (walking upward from the given path)
//! supplies the version: the first eight hex digits of `HEAD`, with `.dirty`
//! appended when tracked files have uncommitted changes. Anything that goes
//! wrong in the repository layer falls back to `unversioned`.

use std::path::Path;

use git2::{Repository, StatusOptions};

use flowpack_core::BuildVersion;

/// Length of the abbreviated revision id.
pub const SHORT_ID_LEN: usize = 8;

/// A resolved checkout revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub short_id: String,
    pub dirty: bool,
}

/// Outcome of looking for a checkout around a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionLookup {
    Resolved(Revision),
    NotAVersionControlRoot,
}

impl From<RevisionLookup> for BuildVersion {
    fn from(lookup: RevisionLookup) -> Self {
        match lookup {
            RevisionLookup::Resolved(rev) => BuildVersion::from_revision(&rev.short_id, rev.dirty),
            RevisionLookup::NotAVersionControlRoot => BuildVersion::unversioned(),
        }
    }
}

/// Find the checkout enclosing `path` and read its current revision.
pub fn lookup_revision(path: &Path) -> RevisionLookup {
    match read_revision(path) {
        Ok(rev) => RevisionLookup::Resolved(rev),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "no usable git checkout");
            RevisionLookup::NotAVersionControlRoot
        }
    }
}

/// `explicit` if given, otherwise the revision of the checkout enclosing `path`.
pub fn resolve_version(path: &Path, explicit: Option<&str>) -> BuildVersion {
    match explicit {
        Some(version) => BuildVersion::new(version),
        None => lookup_revision(path).into(),
    }
}

fn read_revision(path: &Path) -> Result<Revision, git2::Error> {
    let repo = Repository::discover(path)?;
    let id = repo.head()?.peel_to_commit()?.id().to_string();
    let short_id = id.chars().take(SHORT_ID_LEN).collect();

    // Untracked files do not make a tree dirty.
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let dirty = !repo.statuses(Some(&mut opts))?.is_empty();

    Ok(Revision { short_id, dirty })
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn commit_all(repo: &Repository, message: &str) -> Oid {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("flowpack", "flowpack@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    fn init_repo_with_file() -> (TempDir, Repository, Oid) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("project.yml"), "name: demo\n").unwrap();
        let oid = commit_all(&repo, "initial");
        (dir, repo, oid)
    }

    #[test]
    fn clean_checkout_yields_short_revision() {
        let (dir, _repo, oid) = init_repo_with_file();
        let version = resolve_version(dir.path(), None);
        assert_eq!(version.as_str(), &oid.to_string()[..SHORT_ID_LEN]);
        assert!(!version.is_uncommitted());
    }

    #[test]
    fn modified_tracked_file_yields_dirty_suffix() {
        let (dir, _repo, oid) = init_repo_with_file();
        fs::write(dir.path().join("project.yml"), "name: changed\n").unwrap();
        let version = resolve_version(dir.path(), None);
        assert_eq!(
            version.as_str(),
            format!("{}.dirty", &oid.to_string()[..SHORT_ID_LEN])
        );
    }

    #[test]
    fn untracked_file_keeps_tree_clean() {
        let (dir, _repo, oid) = init_repo_with_file();
        fs::write(dir.path().join("notes.txt"), "scratch").unwrap();
        let version = resolve_version(dir.path(), None);
        assert_eq!(version.as_str(), &oid.to_string()[..SHORT_ID_LEN]);
    }

    #[test]
    fn lookup_walks_up_from_subdirectory() {
        let (dir, _repo, oid) = init_repo_with_file();
        let nested = dir.path().join("projects").join("etl");
        fs::create_dir_all(&nested).unwrap();
        match lookup_revision(&nested) {
            RevisionLookup::Resolved(rev) => {
                assert_eq!(rev.short_id, oid.to_string()[..SHORT_ID_LEN]);
            }
            other => panic!("expected resolved revision, got {other:?}"),
        }
    }

    #[test]
    fn repository_without_commits_is_unversioned() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        assert_eq!(
            resolve_version(dir.path(), None).as_str(),
            BuildVersion::UNVERSIONED
        );
    }

    #[test]
    fn no_checkout_is_unversioned() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            lookup_revision(dir.path()),
            RevisionLookup::NotAVersionControlRoot
        );
        assert_eq!(
            resolve_version(dir.path(), None).as_str(),
            BuildVersion::UNVERSIONED
        );
    }

    #[test]
    fn explicit_version_wins() {
        let (dir, _repo, _) = init_repo_with_file();
        assert_eq!(resolve_version(dir.path(), Some("2.1.0")).as_str(), "2.1.0");
    }
}
