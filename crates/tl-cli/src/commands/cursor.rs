//! Implementation of the `tl cursor` command.
//!
//! Global storage is primary; per-workspace databases are the fallback.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tl_core::{ProjectIdentity, ProjectQuery, PromptReport, Reconciliation, reconcile};
use tl_db::cursor::{GlobalStore, WorkspaceStore};

use super::util::write_json;

pub const TOOL: &str = "Cursor";

pub fn reconcile_prompts(cursor_dir: &Path, query: &ProjectQuery) -> Reconciliation {
    let identity = ProjectIdentity::resolve(query.clone());
    let global = GlobalStore::new(cursor_dir);
    let workspaces = WorkspaceStore::new(cursor_dir);
    reconcile(&identity, &global, &[&workspaces])
}

pub fn collect(cursor_dir: &Path, query: &ProjectQuery) -> PromptReport {
    PromptReport::assemble(TOOL, query, reconcile_prompts(cursor_dir, query))
}

pub fn run<W: Write>(writer: &mut W, cursor_dir: &Path, query: &ProjectQuery) -> Result<()> {
    write_json(writer, &collect(cursor_dir, query))
}
