//! Codex CLI session logs.
//!
//! Sessions live under `sessions/YYYY/MM/DD/rollout-*.jsonl`. The first
//! `session_meta` entry names the working directory; each `user_message`
//! event is one prompt. Codex has no tool-result echoes, so every prompt is
//! real.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::claude::{parse_line, read_lines};
use crate::event::{EventRecord, SourceId};
use crate::source::{LogScope, LogStore, ScannedLog};
use crate::timestamp;

#[derive(Debug, Deserialize)]
struct CodexLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<String>,
    payload: Option<CodexPayload>,
}

#[derive(Debug, Deserialize)]
struct CodexPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CodexStore {
    sessions_dir: PathBuf,
}

impl CodexStore {
    pub fn new(codex_dir: &Path) -> Self {
        Self {
            sessions_dir: codex_dir.join("sessions"),
        }
    }
}

impl LogStore for CodexStore {
    type Log = PathBuf;

    fn id(&self) -> SourceId {
        SourceId::Codex
    }

    /// Every session file; the store has no project-keyed layout to narrow by.
    fn logs(&self, _scope: LogScope<'_>) -> Vec<PathBuf> {
        let pattern = self.sessions_dir.join("**").join("*.jsonl");
        let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
            tracing::warn!(pattern = %pattern.display(), "invalid session glob");
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
        files.sort();
        files
    }

    fn identify_owner(&self, log: &PathBuf) -> Option<String> {
        read_lines(log)?
            .filter(|line| line.contains("session_meta"))
            .filter_map(|line| parse_line::<CodexLine>(&line))
            .filter(|entry| entry.kind.as_deref() == Some("session_meta"))
            .find_map(|entry| entry.payload?.cwd.filter(|c| !c.is_empty()))
    }

    fn scan_records(&self, log: &PathBuf, _owner: &str) -> ScannedLog {
        let Some(lines) = read_lines(log) else {
            return ScannedLog::default();
        };

        let records = lines
            .filter(|line| line.contains("user_message"))
            .filter_map(|line| parse_line::<CodexLine>(&line))
            .filter(|entry| {
                entry.kind.as_deref() == Some("event_msg")
                    && entry
                        .payload
                        .as_ref()
                        .is_some_and(|p| p.kind.as_deref() == Some("user_message"))
            })
            .filter_map(|entry| {
                let epoch = timestamp::parse_iso8601(entry.timestamp.as_deref()?)
                    .inspect_err(|e| tracing::trace!(error = %e, "skipping codex event"))
                    .ok()?;
                EventRecord::new(SourceId::Codex, epoch, true).ok()
            })
            .collect();

        ScannedLog::single_session(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    use crate::project::{ProjectIdentity, ProjectQuery};
    use crate::source::Source;

    fn meta(cwd: &str) -> String {
        format!(
            r#"{{"timestamp":"2026-01-29T09:59:00.000Z","type":"session_meta","payload":{{"id":"abc","cwd":"{cwd}","cli_version":"0.44.0"}}}}"#
        )
    }

    fn prompt(ts: &str) -> String {
        format!(
            r#"{{"timestamp":"{ts}","type":"event_msg","payload":{{"type":"user_message","message":"do it"}}}}"#
        )
    }

    fn write_session(root: &Path, rel: &str, lines: &[String]) {
        let path = root.join("sessions").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, lines.join("\n")).unwrap();
    }

    #[test]
    fn test_codex_counts_user_messages_for_project() {
        let temp = TempDir::new().unwrap();
        write_session(
            temp.path(),
            "2026/01/29/rollout-a.jsonl",
            &[
                meta("/work/app"),
                prompt("2026-01-29T10:00:00.000Z"),
                r#"{"timestamp":"2026-01-29T10:00:02.000Z","type":"event_msg","payload":{"type":"agent_message","message":"user_message"}}"#.to_string(),
                r#"{"timestamp":"2026-01-29T10:00:03.000Z","type":"response_item","payload":{"type":"message","role":"user"}}"#.to_string(),
                prompt("2026-01-29T10:05:00.000Z"),
                "{broken".to_string(),
            ],
        );
        write_session(
            temp.path(),
            "2026/01/30/rollout-b.jsonl",
            &[meta("/work/other"), prompt("2026-01-30T10:00:00.000Z")],
        );

        let store = CodexStore::new(temp.path());
        let scan = store.scan(&ProjectIdentity::resolve(ProjectQuery::Path(
            "/work/app".into(),
        )));

        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.sessions, Some(1));
        assert!(scan.records.iter().all(|r| r.is_real_prompt));
    }

    #[test]
    fn test_codex_file_without_meta_is_skipped() {
        let temp = TempDir::new().unwrap();
        write_session(
            temp.path(),
            "2026/01/29/rollout-c.jsonl",
            &[prompt("2026-01-29T10:00:00.000Z")],
        );

        let store = CodexStore::new(temp.path());
        let scan = store.scan(&ProjectIdentity::resolve(ProjectQuery::Filter("app".into())));
        assert!(scan.records.is_empty());
        assert!(store.known_projects().is_empty());
    }

    #[test]
    fn test_codex_known_projects() {
        let temp = TempDir::new().unwrap();
        write_session(temp.path(), "2026/01/29/a.jsonl", &[meta("/x/app")]);
        write_session(temp.path(), "2026/01/30/b.jsonl", &[meta("/y/app")]);

        let known = CodexStore::new(temp.path()).known_projects();
        assert_eq!(known.len(), 2);
        assert!(known.contains("/x/app"));
    }

    #[test]
    fn test_codex_skips_bad_lines_and_unreadable_files() {
        let temp = TempDir::new().unwrap();
        let day = temp.path().join("sessions/2026/01/29");
        fs::create_dir_all(&day).unwrap();

        let mut bytes = format!("{}\n{}\n", meta("/work/app"), prompt("2026-01-29T10:00:00.000Z"))
            .into_bytes();
        bytes.extend_from_slice(b"{\"type\":\"event_msg\",\"x\":\"\xff\"}\n");
        bytes.extend_from_slice(format!("{}\n", prompt("2026-01-29T10:05:00.000Z")).as_bytes());
        fs::write(day.join("rollout-a.jsonl"), bytes).unwrap();
        // A directory matching the glob: opening works, reading does not.
        fs::create_dir_all(day.join("rollout-b.jsonl")).unwrap();

        let store = CodexStore::new(temp.path());
        let scan = store.scan(&ProjectIdentity::resolve(ProjectQuery::Path(
            "/work/app".into(),
        )));

        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.sessions, Some(1));
    }

    #[test]
    fn test_codex_missing_dir() {
        let temp = TempDir::new().unwrap();
        let store = CodexStore::new(&temp.path().join("nope"));
        assert!(store.logs(LogScope::All).is_empty());
    }
}
