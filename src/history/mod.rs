//! Version-history collaborator backed by git2.
//!
//! Absent or broken history is empty data, not an error, and every walk
//! honors a wall-clock deadline so a huge repository can only ever slow
//! one signal down, never hang a request.

use crate::signal::HistoryProvider;
use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use git2::{Commit, Repository};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub struct GitHistory {
    repo_root: PathBuf,
    deadline: Duration,
}

impl GitHistory {
    /// Returns `None` when the project root is not inside a git
    /// repository; the engine then runs with the co-change signal at
    /// zero.
    pub fn discover(project_root: &Path, deadline_ms: u64) -> Option<Self> {
        let repo = Repository::discover(project_root).ok()?;
        let repo_root = repo.workdir()?.to_path_buf();
        Some(Self { repo_root, deadline: Duration::from_millis(deadline_ms) })
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::open(&self.repo_root)?)
    }

    /// Relative paths touched by a commit, against its first parent.
    fn changed_paths(repo: &Repository, commit: &Commit<'_>) -> Result<HashSet<String>> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };
        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let mut paths = HashSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path().and_then(|p| p.to_str()) {
                    paths.insert(path.replace('\\', "/"));
                }
            }
        }
        Ok(paths)
    }
}

impl HistoryProvider for GitHistory {
    fn recently_modified(&self, hours_window: u64) -> Result<HashSet<String>> {
        let repo = match self.open() {
            Ok(r) => r,
            Err(_) => return Ok(HashSet::new()),
        };
        let cutoff = (Utc::now() - ChronoDuration::hours(hours_window as i64)).timestamp();
        let started = Instant::now();

        let mut revwalk = match repo.revwalk() {
            Ok(w) => w,
            Err(_) => return Ok(HashSet::new()),
        };
        if revwalk.push_head().is_err() {
            // Unborn HEAD: repository with no commits yet.
            return Ok(HashSet::new());
        }

        let mut modified = HashSet::new();
        for oid in revwalk.flatten() {
            if started.elapsed() > self.deadline {
                tracing::debug!("recently_modified walk hit deadline, returning partial set");
                break;
            }
            let Ok(commit) = repo.find_commit(oid) else { continue };
            if commit.time().seconds() < cutoff {
                break;
            }
            if let Ok(paths) = Self::changed_paths(&repo, &commit) {
                modified.extend(paths);
            }
        }
        Ok(modified)
    }

    fn co_change_frequency(
        &self,
        focal_file: &str,
        lookback: usize,
    ) -> Result<HashMap<String, f64>> {
        let repo = match self.open() {
            Ok(r) => r,
            Err(_) => return Ok(HashMap::new()),
        };
        let started = Instant::now();

        let mut revwalk = match repo.revwalk() {
            Ok(w) => w,
            Err(_) => return Ok(HashMap::new()),
        };
        if revwalk.push_head().is_err() {
            return Ok(HashMap::new());
        }

        let mut focal_commits = 0u32;
        let mut co_counts: HashMap<String, u32> = HashMap::new();

        for oid in revwalk.flatten().take(lookback) {
            if started.elapsed() > self.deadline {
                tracing::debug!("co-change walk hit deadline, returning partial counts");
                break;
            }
            let Ok(commit) = repo.find_commit(oid) else { continue };
            let Ok(paths) = Self::changed_paths(&repo, &commit) else { continue };
            if !paths.contains(focal_file) {
                continue;
            }
            focal_commits += 1;
            for path in paths {
                if path != focal_file {
                    *co_counts.entry(path).or_insert(0) += 1;
                }
            }
        }

        if focal_commits == 0 {
            return Ok(HashMap::new());
        }
        Ok(co_counts
            .into_iter()
            .map(|(path, count)| (path, count as f64 / focal_commits as f64))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "t")
            .env("GIT_AUTHOR_EMAIL", "t@t")
            .env("GIT_COMMITTER_NAME", "t")
            .env("GIT_COMMITTER_EMAIL", "t@t")
            .status()
            .expect("git available");
        assert!(status.success(), "git {args:?} failed");
    }

    fn commit_files(dir: &Path, files: &[(&str, &str)], message: &str) {
        for (path, content) in files {
            let full = dir.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }
        git(dir, &["add", "-A"]);
        git(dir, &["commit", "-m", message]);
    }

    #[test]
    fn no_repository_means_no_provider() {
        let tmp = TempDir::new().unwrap();
        // TempDir may live under a real repo; only assert when isolated.
        if Repository::discover(tmp.path()).is_err() {
            assert!(GitHistory::discover(tmp.path(), 1000).is_none());
        }
    }

    #[test]
    fn empty_repository_degrades_to_empty_results() {
        let tmp = TempDir::new().unwrap();
        git(tmp.path(), &["init", "-q"]);
        let history = GitHistory::discover(tmp.path(), 1000).unwrap();
        assert!(history.recently_modified(24).unwrap().is_empty());
        assert!(history.co_change_frequency("src/a.rs", 50).unwrap().is_empty());
    }

    #[test]
    fn co_change_counts_shared_commits() {
        let tmp = TempDir::new().unwrap();
        git(tmp.path(), &["init", "-q"]);

        // Two commits touch focal+paired, one touches focal alone, one is
        // unrelated.
        commit_files(tmp.path(), &[("src/focal.rs", "1"), ("src/paired.rs", "1")], "one");
        commit_files(tmp.path(), &[("src/focal.rs", "2"), ("src/paired.rs", "2")], "two");
        commit_files(tmp.path(), &[("src/focal.rs", "3")], "three");
        commit_files(tmp.path(), &[("docs/notes.md", "x")], "four");

        let history = GitHistory::discover(tmp.path(), 5_000).unwrap();
        let freq = history.co_change_frequency("src/focal.rs", 50).unwrap();

        let paired = freq.get("src/paired.rs").copied().unwrap_or(0.0);
        assert!((paired - 2.0 / 3.0).abs() < 1e-9, "got {paired}");
        assert!(!freq.contains_key("docs/notes.md"));
        assert!(!freq.contains_key("src/focal.rs"));
    }

    #[test]
    fn recently_modified_sees_fresh_commits() {
        let tmp = TempDir::new().unwrap();
        git(tmp.path(), &["init", "-q"]);
        commit_files(tmp.path(), &[("src/a.rs", "1")], "one");

        let history = GitHistory::discover(tmp.path(), 5_000).unwrap();
        let recent = history.recently_modified(24).unwrap();
        assert!(recent.contains("src/a.rs"));
    }
}
