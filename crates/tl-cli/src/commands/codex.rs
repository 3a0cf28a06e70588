//! Implementation of the `tl codex` command.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tl_core::codex::CodexStore;
use tl_core::{ProjectIdentity, ProjectQuery, PromptReport, Reconciliation, reconcile};

use super::util::write_json;

pub const TOOL: &str = "Codex";

pub fn reconcile_prompts(codex_dir: &Path, query: &ProjectQuery) -> Reconciliation {
    let identity = ProjectIdentity::resolve(query.clone());
    reconcile(&identity, &CodexStore::new(codex_dir), &[])
}

pub fn collect(codex_dir: &Path, query: &ProjectQuery) -> PromptReport {
    PromptReport::assemble(TOOL, query, reconcile_prompts(codex_dir, query))
}

pub fn run<W: Write>(writer: &mut W, codex_dir: &Path, query: &ProjectQuery) -> Result<()> {
    write_json(writer, &collect(codex_dir, query))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use insta::assert_snapshot;
    use tempfile::TempDir;

    #[test]
    fn codex_command_reports_sessions() {
        let temp = TempDir::new().unwrap();
        let day = temp.path().join("sessions/2026/01/29");
        fs::create_dir_all(&day).unwrap();
        fs::write(
            day.join("rollout-2026-01-29T10-00-00-abc.jsonl"),
            [
                r#"{"timestamp":"2026-01-29T09:59:58.000Z","type":"session_meta","payload":{"id":"abc","cwd":"/work/app"}}"#,
                r#"{"timestamp":"2026-01-29T10:00:00.000Z","type":"event_msg","payload":{"type":"user_message","message":"hi"}}"#,
                r#"{"timestamp":"2026-01-29T10:30:00.000Z","type":"event_msg","payload":{"type":"user_message","message":"more"}}"#,
            ]
            .join("\n"),
        )
        .unwrap();

        let mut output = Vec::new();
        run(
            &mut output,
            temp.path(),
            &ProjectQuery::Filter("app".to_string()),
        )
        .unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap().trim_end(), @r#"
        {
          "project_path": "app",
          "total_user_messages": 2,
          "daily": {
            "2026-01-29": 2
          },
          "sources": {
            "rollouts": 2
          },
          "sessions_found": 1,
          "timestamps": [
            1769680800.0,
            1769682600.0
          ]
        }
        "#);
    }

    #[test]
    fn codex_command_missing_store_is_empty() {
        let temp = TempDir::new().unwrap();
        let report = collect(temp.path(), &ProjectQuery::Path("/work/app".to_string()));
        assert_eq!(report.total_user_messages, 0);
        assert_eq!(report.note.as_deref(), Some("No matching Codex activity found"));
    }
}
