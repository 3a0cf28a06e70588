//! Implementation of the `tl git` command.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tl_core::git::{Commit, DateRange, read_commits};
use tl_core::{ClusterConfig, SessionReport, cluster_sessions};

use super::util::write_json;

/// Sessions estimated from one repository's commits.
#[derive(Debug, Clone, Serialize)]
pub struct GitReport {
    pub repo: String,
    #[serde(flatten)]
    pub sessions: SessionReport,
}

/// Commits in range, or nothing when the log cannot be read.
fn commits_or_empty(repo: &Path, range: &DateRange) -> Vec<Commit> {
    read_commits(repo, range).unwrap_or_else(|e| {
        tracing::warn!(repo = %repo.display(), error = %e, "failed to read git history");
        Vec::new()
    })
}

/// Cluster a repository's commits; `None` when there are none in range.
pub fn collect(repo: &Path, range: &DateRange, clustering: &ClusterConfig) -> Option<GitReport> {
    let commits = commits_or_empty(repo, range);
    let summary = cluster_sessions(&commits, clustering).ok()?;
    Some(GitReport {
        repo: repo.display().to_string(),
        sessions: SessionReport::assemble(&summary, clustering.overhead_hours),
    })
}

pub fn run<W: Write>(
    writer: &mut W,
    repo: &Path,
    range: &DateRange,
    clustering: &ClusterConfig,
) -> Result<()> {
    match collect(repo, range, clustering) {
        Some(report) => write_json(writer, &report),
        None => write_json(
            writer,
            &serde_json::json!({
                "repo": repo.display().to_string(),
                "error": "no commits found",
            }),
        ),
    }
}
