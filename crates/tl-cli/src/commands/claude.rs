//! Implementation of the `tl claude` command.
//!
//! `history.jsonl` is the primary stream; per-project session transcripts
//! fill in prompts the history file never saw.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tl_core::claude::{HistoryStore, SessionFileStore};
use tl_core::{ProjectIdentity, ProjectQuery, PromptReport, Reconciliation, reconcile};

use super::util::write_json;

pub const TOOL: &str = "Claude";

pub fn reconcile_prompts(claude_dir: &Path, query: &ProjectQuery) -> Reconciliation {
    let identity = ProjectIdentity::resolve(query.clone());
    let history = HistoryStore::new(claude_dir);
    let transcripts = SessionFileStore::new(claude_dir);
    reconcile(&identity, &history, &[&transcripts])
}

pub fn collect(claude_dir: &Path, query: &ProjectQuery) -> PromptReport {
    PromptReport::assemble(TOOL, query, reconcile_prompts(claude_dir, query))
}

pub fn run<W: Write>(writer: &mut W, claude_dir: &Path, query: &ProjectQuery) -> Result<()> {
    write_json(writer, &collect(claude_dir, query))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use insta::assert_snapshot;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("history.jsonl"),
            [
                r#"{"display":"fix the bug","project":"/work/app","timestamp":1769680800000}"#,
                r#"{"display":"ship it","project":"/work/app","timestamp":1769767200000}"#,
                r#"{"display":"elsewhere","project":"/work/api","timestamp":1769767200000}"#,
            ]
            .join("\n"),
        )
        .unwrap();

        let dir = temp.path().join("projects").join("-work-app");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("0b1d.jsonl"),
            [
                r#"{"type":"user","cwd":"/work/app","timestamp":"2026-01-29T10:00:00.300Z","message":{"role":"user","content":"fix the bug"}}"#,
                r#"{"type":"user","cwd":"/work/app","timestamp":"2026-01-29T10:01:00.000Z","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1"}]}}"#,
                r#"{"type":"user","cwd":"/work/app","timestamp":"2026-01-28T09:00:00.000Z","message":{"role":"user","content":"older prompt"}}"#,
            ]
            .join("\n"),
        )
        .unwrap();
        temp
    }

    #[test]
    fn claude_command_merges_history_and_transcripts() {
        let temp = fixture();
        let query = ProjectQuery::Path("/work/app".to_string());

        let mut output = Vec::new();
        run(&mut output, temp.path(), &query).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap().trim_end(), @r#"
        {
          "project_path": "/work/app",
          "total_user_messages": 3,
          "daily": {
            "2026-01-28": 1,
            "2026-01-29": 1,
            "2026-01-30": 1
          },
          "sources": {
            "history": 2,
            "session_files": 1
          },
          "sessions_found": 1,
          "timestamps": [
            1769590800.0,
            1769680800.0,
            1769767200.0
          ]
        }
        "#);
    }

    #[test]
    fn claude_command_reports_moved_project() {
        let temp = fixture();
        let query = ProjectQuery::Path("/old/place/app".to_string());

        let report = collect(temp.path(), &query);

        assert_eq!(report.total_user_messages, 0);
        assert_eq!(report.alternate_paths, vec!["/work/app".to_string()]);
        assert!(report.note.unwrap().contains("Project may have been moved"));
    }

    #[test]
    fn claude_command_filter_matches_basename() {
        let temp = fixture();
        let report = collect(temp.path(), &ProjectQuery::Filter("AP".to_string()));
        // Both /work/app and /work/api match "ap".
        assert_eq!(report.total_user_messages, 4);
        assert!(report.alternate_paths.is_empty());
    }
}
