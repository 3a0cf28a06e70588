//! Implementation of the `tl timeline` command.
//!
//! Runs every prompt pipeline for one project, sums their daily counts per
//! tool (prompts in different tools are distinct events, so there is no
//! cross-tool deduplication), clusters the union of prompt times into work
//! sessions, and attaches git sessions when the project is a repository.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tl_core::git::{DateRange, is_repository};
use tl_core::{MergedCounts, ProjectQuery, Reconciliation, SessionReport, cluster_sessions};

use super::git::GitReport;
use super::util::write_json;
use super::{claude, codex, cursor};
use crate::Config;

fn daily_keys(counts: &MergedCounts) -> BTreeMap<String, u64> {
    counts
        .daily
        .iter()
        .map(|(date, count)| (date.format("%Y-%m-%d").to_string(), *count))
        .collect()
}

/// One tool's contribution, restricted to the requested dates.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub total_user_messages: u64,
    pub daily: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_found: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate_paths: Vec<String>,
}

impl ToolSummary {
    fn new(counts: &MergedCounts, alternate_paths: Vec<String>) -> Self {
        Self {
            total_user_messages: counts.total,
            daily: daily_keys(counts),
            sessions_found: counts.sessions,
            alternate_paths,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub project_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    pub total_user_messages: u64,
    pub daily: BTreeMap<String, u64>,
    pub tools: BTreeMap<&'static str, ToolSummary>,
    /// Work sessions clustered from prompts across every tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitReport>,
}

pub fn collect(config: &Config, query: &ProjectQuery, range: &DateRange) -> Timeline {
    let (claude_result, (codex_result, cursor_result)) = rayon::join(
        || claude::reconcile_prompts(&config.claude_dir, query),
        || {
            rayon::join(
                || codex::reconcile_prompts(&config.codex_dir, query),
                || cursor::reconcile_prompts(&config.cursor_dir, query),
            )
        },
    );

    let mut combined = MergedCounts::default();
    let mut tools = BTreeMap::new();
    for (name, result) in [
        ("claude", claude_result),
        ("codex", codex_result),
        ("cursor", cursor_result),
    ] {
        let Reconciliation {
            merged,
            alternate_paths,
        } = result;
        let in_range = merged.retain_dates(|date| range.contains(date));
        combined.absorb(&in_range);
        tools.insert(name, ToolSummary::new(&in_range, alternate_paths));
    }

    let sessions = cluster_sessions(&combined.counted, &config.clustering)
        .ok()
        .map(|summary| SessionReport::assemble(&summary, config.clustering.overhead_hours));

    let git = query
        .path()
        .map(Path::new)
        .filter(|path| is_repository(path))
        .and_then(|repo| super::git::collect(repo, range, &config.clustering));

    tracing::debug!(
        tools = tools.len(),
        prompts = combined.total,
        git = git.is_some(),
        "assembled timeline"
    );

    Timeline {
        project_path: query.label().to_string(),
        since: range.since,
        until: range.until,
        total_user_messages: combined.total,
        daily: daily_keys(&combined),
        tools,
        sessions,
        git,
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    query: &ProjectQuery,
    range: &DateRange,
) -> Result<()> {
    write_json(writer, &collect(config, query, range))
}
