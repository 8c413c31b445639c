//! Git utilities for ccstatus.
//!
//! Provides the current branch name for the status line, with a short-lived
//! read-through cache in front of the `git` subprocess.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Gets the current branch name for a git repository.
///
/// Runs `git branch --show-current` in the given directory. Returns `None`
/// on any error (not a git repo, git not installed, missing directory) and
/// for a detached HEAD, where git prints nothing.
pub fn get_current_branch(cwd: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["branch", "--show-current"])
        .current_dir(cwd)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!branch.is_empty()).then_some(branch)
}

#[derive(Debug, Clone)]
struct CachedBranch {
    dir: PathBuf,
    branch: String,
    expires: Instant,
}

/// Branch lookup cache shared between render tasks.
///
/// Readers take the read lock and reuse a fresh entry for the same directory;
/// otherwise git is queried and a successful result is stored.
#[derive(Debug)]
pub struct BranchCache {
    ttl: Duration,
    entry: RwLock<Option<CachedBranch>>,
}

impl BranchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn branch(&self, cwd: &Path) -> Option<String> {
        self.branch_with(cwd, get_current_branch)
    }

    fn branch_with(&self, cwd: &Path, lookup: impl FnOnce(&Path) -> Option<String>) -> Option<String> {
        if let Ok(guard) = self.entry.read() {
            if let Some(cached) = guard.as_ref() {
                if cached.dir == cwd && Instant::now() < cached.expires {
                    return Some(cached.branch.clone());
                }
            }
        }

        let branch = lookup(cwd)?;
        if let Ok(mut guard) = self.entry.write() {
            *guard = Some(CachedBranch {
                dir: cwd.to_path_buf(),
                branch: branch.clone(),
                expires: Instant::now() + self.ttl,
            });
        }
        Some(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_get_current_branch_not_a_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_current_branch(dir.path()), None);
    }

    #[test]
    fn test_get_current_branch_nonexistent_directory() {
        let cwd = PathBuf::from("/this/path/does/not/exist/at/all");
        assert_eq!(get_current_branch(&cwd), None);
    }

    #[test]
    fn test_cache_reuses_fresh_entry() {
        let cache = BranchCache::new(Duration::from_secs(5));
        let calls = Cell::new(0);
        let lookup = |_: &Path| {
            calls.set(calls.get() + 1);
            Some("main".to_string())
        };

        assert_eq!(cache.branch_with(Path::new("/repo"), lookup), Some("main".to_string()));
        assert_eq!(cache.branch_with(Path::new("/repo"), lookup), Some("main".to_string()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_cache_expires() {
        let cache = BranchCache::new(Duration::ZERO);
        let calls = Cell::new(0);
        let lookup = |_: &Path| {
            calls.set(calls.get() + 1);
            Some("main".to_string())
        };

        cache.branch_with(Path::new("/repo"), lookup);
        cache.branch_with(Path::new("/repo"), lookup);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_cache_is_keyed_by_directory() {
        let cache = BranchCache::new(Duration::from_secs(5));
        cache.branch_with(Path::new("/a"), |_| Some("main".to_string()));
        let other = cache.branch_with(Path::new("/b"), |_| Some("dev".to_string()));
        assert_eq!(other, Some("dev".to_string()));
    }

    #[test]
    fn test_failed_lookup_is_not_cached() {
        let cache = BranchCache::new(Duration::from_secs(5));
        assert_eq!(cache.branch_with(Path::new("/repo"), |_| None), None);
        assert_eq!(
            cache.branch_with(Path::new("/repo"), |_| Some("main".to_string())),
            Some("main".to_string())
        );
    }
}
