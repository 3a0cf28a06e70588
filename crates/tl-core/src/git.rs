//! Git commit history as a work-session signal.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;

use crate::cluster::Timestamped;
use crate::timestamp;

/// `%x09` is a tab; subjects may contain anything else.
const LOG_FORMAT: &str = "--format=%H%x09%aI%x09%s";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git log exited with {status}: {stderr}")]
    Failed { status: i32, stderr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    /// Author time in the author's own offset.
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

impl Timestamped for Commit {
    fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        Some(self.timestamp)
    }
}

/// Inclusive calendar-date bounds, compared against the author-local date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.since.is_none_or(|since| date >= since) && self.until.is_none_or(|until| date <= until)
    }
}

/// Whether `path` is inside a git work tree.
pub fn is_repository(path: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--is-inside-work-tree"])
        .output()
        .is_ok_and(|out| out.status.success())
}

/// Read non-merge commits of a repository, oldest first.
pub fn read_commits(repo: &Path, range: &DateRange) -> Result<Vec<Commit>, GitError> {
    if !repo.is_dir() {
        return Err(GitError::NotARepository(repo.to_path_buf()));
    }

    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["log", "--no-merges", LOG_FORMAT])
        .output()?;

    if !output.status.success() {
        return Err(GitError::Failed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let commits = parse_log(&String::from_utf8_lossy(&output.stdout), range);
    tracing::debug!(repo = %repo.display(), commits = commits.len(), "read git log");
    Ok(commits)
}

/// Parse `sha<TAB>iso-date<TAB>subject` lines, dropping unparseable ones.
pub fn parse_log(output: &str, range: &DateRange) -> Vec<Commit> {
    let mut commits: Vec<Commit> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let sha = parts.next()?;
            let ts = parts.next()?;
            let message = parts.next().unwrap_or_default();
            match timestamp::parse_with_offset(ts) {
                Ok(timestamp) => Some(Commit {
                    sha: sha.to_string(),
                    timestamp,
                    message: message.to_string(),
                }),
                Err(e) => {
                    tracing::trace!(sha, error = %e, "skipping commit");
                    None
                }
            }
        })
        .filter(|commit| range.contains(commit.timestamp.date_naive()))
        .collect();
    commits.sort_by_key(|c| c.timestamp);
    commits
}
