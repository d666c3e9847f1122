//! The few git invocations `init` and `serve` need.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

fn git(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd
}

/// Whether `dir` sits inside a git work tree.
pub fn is_work_tree(dir: &Path) -> bool {
    git(dir)
        .args(["rev-parse", "--is-inside-work-tree"])
        .output()
        .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true")
        .unwrap_or(false)
}

/// Checked-out branch, if any.
pub fn branch(dir: &Path) -> Option<String> {
    let out = git(dir)
        .args(["symbolic-ref", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Stage everything and commit, dated `at` when given.
pub fn commit(dir: &Path, message: &str, at: Option<DateTime<Utc>>) -> Result<()> {
    let date = at.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));
    let run = |args: &[&str]| -> Result<()> {
        let mut cmd = git(dir);
        cmd.args(args);
        if let Some(date) = &date {
            cmd.env("GIT_AUTHOR_DATE", date).env("GIT_COMMITTER_DATE", date);
        }
        let status = cmd
            .status()
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;
        if !status.success() {
            bail!("git {} exited with {status}", args.join(" "));
        }
        Ok(())
    };
    run(&["add", "-A"])?;
    run(&["commit", "--allow-empty", "-a", "-q", "-m", message])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_directory_is_not_a_work_tree() {
        let tmp = TempDir::new().unwrap();
        // Skip when the temp dir itself lives in a checkout.
        if is_work_tree(tmp.path().parent().unwrap()) {
            return;
        }
        assert!(!is_work_tree(tmp.path()));
        assert_eq!(branch(tmp.path()), None);
    }
}
