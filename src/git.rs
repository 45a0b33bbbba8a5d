//! Blocking wrappers over the `git` binary.
//!
//! The version-control system is an external command that returns text:
//! every function here shells out, trims stdout, and surfaces stderr in the
//! error. All reads are against the current working directory's repository
//! unless a directory is given.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Absolute path of the working-tree root (`rev-parse --show-toplevel`).
pub fn toplevel(dir: Option<&Path>) -> Result<PathBuf> {
    let out = run_git(&["rev-parse", "--show-toplevel"], dir)?;
    Ok(PathBuf::from(out))
}

/// True when the working tree has uncommitted changes
/// (`status --porcelain` output is non-empty).
pub fn has_uncommitted_changes(dir: Option<&Path>) -> Result<bool> {
    let status = run_git(&["status", "--porcelain"], dir)?;
    Ok(!status.is_empty())
}

/// Current commit hash (`rev-parse HEAD`).
pub fn head_sha(dir: Option<&Path>) -> Result<String> {
    run_git(&["rev-parse", "HEAD"], dir)
}

/// Current branch name (`rev-parse --abbrev-ref HEAD`).
pub fn current_branch(dir: Option<&Path>) -> Result<String> {
    run_git(&["rev-parse", "--abbrev-ref", "HEAD"], dir)
}

/// Full message of the most recent commit (`log -1 --pretty=%B`).
pub fn last_commit_message(dir: Option<&Path>) -> Result<String> {
    run_git(&["log", "-1", "--pretty=%B"], dir)
}

/// Create an annotated tag with the given name and message body.
pub fn create_annotated_tag(name: &str, message: &str, dir: Option<&Path>) -> Result<()> {
    run_git(&["tag", "-a", name, "-m", message], dir)?;
    debug!(tag = name, "created annotated tag");
    Ok(())
}

fn run_git(args: &[&str], dir: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .with_context(|| format!("failed to execute `git {}`. Is git installed?", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "tester@example.com"],
            vec!["config", "user.name", "Tester"],
        ] {
            let status = Command::new("git")
                .args(&args)
                .current_dir(dir)
                .status()
                .expect("git");
            assert!(status.success(), "git {:?} failed", args);
        }
        tmp
    }

    fn commit_all(dir: &Path, message: &str) {
        for args in [vec!["add", "."], vec!["commit", "-q", "-m", message]] {
            let status = Command::new("git")
                .args(&args)
                .current_dir(dir)
                .status()
                .expect("git");
            assert!(status.success(), "git {:?} failed", args);
        }
    }

    #[test]
    fn toplevel_resolves_repo_root() {
        let repo = init_repo();
        fs::write(repo.path().join("a.txt"), "a").unwrap();
        commit_all(repo.path(), "initial");

        let top = toplevel(Some(repo.path())).expect("toplevel");
        assert_eq!(
            top.canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn uncommitted_changes_reflect_worktree_state() {
        let repo = init_repo();
        fs::write(repo.path().join("a.txt"), "a").unwrap();
        commit_all(repo.path(), "initial");
        assert!(!has_uncommitted_changes(Some(repo.path())).unwrap());

        fs::write(repo.path().join("b.txt"), "b").unwrap();
        assert!(has_uncommitted_changes(Some(repo.path())).unwrap());
    }

    #[test]
    fn head_metadata_matches_last_commit() {
        let repo = init_repo();
        fs::write(repo.path().join("a.txt"), "a").unwrap();
        commit_all(repo.path(), "first commit");

        let sha = head_sha(Some(repo.path())).unwrap();
        assert_eq!(sha.len(), 40);
        assert_eq!(
            last_commit_message(Some(repo.path())).unwrap(),
            "first commit"
        );
        assert!(!current_branch(Some(repo.path())).unwrap().is_empty());
    }

    #[test]
    fn annotated_tag_roundtrips() {
        let repo = init_repo();
        fs::write(repo.path().join("a.txt"), "a").unwrap();
        commit_all(repo.path(), "initial");

        create_annotated_tag("push.test.20250101T000000", "{\"k\": \"v\"}", Some(repo.path()))
            .unwrap();
        let message = run_git(
            &["tag", "-l", "-n99", "--format=%(contents)", "push.test.20250101T000000"],
            Some(repo.path()),
        )
        .unwrap();
        assert!(message.contains("\"k\": \"v\""));
    }

    #[test]
    fn failing_command_surfaces_stderr() {
        let repo = init_repo();
        let err = run_git(&["rev-parse", "HEAD"], Some(repo.path())).unwrap_err();
        assert!(err.to_string().contains("git rev-parse HEAD failed"));
    }
}
