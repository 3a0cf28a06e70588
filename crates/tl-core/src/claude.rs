//! Claude Code prompt sources.
//!
//! Primary: `history.jsonl`, one entry per submitted prompt with the exact
//! project path and an epoch-millisecond timestamp. It cannot tell a real
//! prompt from anything else, so every entry counts.
//!
//! Fallback: per-project session transcripts under `projects/<encoded>/`.
//! They cover sessions that predate the history file but interleave
//! tool-result echoes with real prompts.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::event::{EventRecord, SourceId};
use crate::project::normalize_path;
use crate::source::{LogScope, LogStore, ScannedLog};
use crate::timestamp;

/// Buffer size for `BufReader` (64KB for large transcripts).
const BUFFER_SIZE: usize = 64 * 1024;

/// Content block type marking a tool result echoed back as a user message.
const TOOL_RESULT: &str = "tool_result";

/// Open a log for lazy line-by-line reading.
///
/// A line that is not valid UTF-8 is skipped; the reader has already consumed
/// it, so the next line follows. Any other read error ends the file.
pub(crate) fn read_lines(path: &Path) -> Option<impl Iterator<Item = String> + use<>> {
    let file = File::open(path)
        .inspect_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable log");
        })
        .ok()?;
    let path = path.to_path_buf();
    let lines = BufReader::with_capacity(BUFFER_SIZE, file)
        .lines()
        .map_while(move |line| match line {
            Ok(line) => Some(Some(line)),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::trace!(path = %path.display(), "skipping non-UTF-8 line");
                Some(None)
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "stopped reading log");
                None
            }
        })
        .flatten();
    Some(lines)
}

/// Parse one JSONL line, skipping blanks and malformed JSON.
pub(crate) fn parse_line<T: serde::de::DeserializeOwned>(line: &str) -> Option<T> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::trace!(error = %e, "skipping malformed JSON line");
            None
        }
    }
}

// ========== history.jsonl ==========

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    project: Option<String>,
    timestamp: Option<Value>,
}

/// All history entries for one project path.
#[derive(Debug, Clone)]
pub struct HistoryBatch {
    pub project: String,
    pub epochs: Vec<f64>,
}

/// The primary Claude source.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(claude_dir: &Path) -> Self {
        Self {
            path: claude_dir.join("history.jsonl"),
        }
    }
}

impl LogStore for HistoryStore {
    type Log = HistoryBatch;

    fn id(&self) -> SourceId {
        SourceId::ClaudeHistory
    }

    /// Group the single history file into one batch per project.
    fn logs(&self, _scope: LogScope<'_>) -> Vec<HistoryBatch> {
        let Some(lines) = read_lines(&self.path) else {
            return Vec::new();
        };

        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for line in lines {
            let Some(entry) = parse_line::<HistoryEntry>(&line) else {
                continue;
            };
            let Some(project) = entry.project.filter(|p| !p.is_empty()) else {
                continue;
            };
            match timestamp::normalize_value(entry.timestamp.as_ref()) {
                Ok(epoch) => groups.entry(project).or_default().push(epoch),
                Err(e) => tracing::trace!(error = %e, "skipping history entry"),
            }
        }

        groups
            .into_iter()
            .map(|(project, epochs)| HistoryBatch { project, epochs })
            .collect()
    }

    fn identify_owner(&self, log: &HistoryBatch) -> Option<String> {
        Some(log.project.clone())
    }

    fn scan_records(&self, log: &HistoryBatch, _owner: &str) -> ScannedLog {
        let records = log
            .epochs
            .iter()
            .filter_map(|&epoch| EventRecord::new(SourceId::ClaudeHistory, epoch, true).ok())
            .collect();
        ScannedLog {
            records,
            sessions: 0,
        }
    }

    fn counts_sessions(&self) -> bool {
        false
    }
}

// ========== projects/<encoded>/*.jsonl ==========

/// Minimal struct for typed deserialization (faster than `serde_json::Value`).
#[derive(Debug, Deserialize)]
struct TranscriptLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    cwd: Option<String>,
    timestamp: Option<String>,
    message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    content: Option<MessageContent>,
}

/// Message content can be a string or an array of content blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: Option<String>,
}

/// Whether a user entry is genuine input rather than a tool-result echo.
///
/// Plain strings are always real. A block list is real unless its first
/// block is a tool result. An absent payload counts as an empty string.
fn is_real_prompt(message: Option<&MessageBody>) -> bool {
    match message.and_then(|m| m.content.as_ref()) {
        None | Some(MessageContent::Text(_)) => true,
        Some(MessageContent::Blocks(blocks)) => blocks
            .first()
            .is_some_and(|b| b.block_type.as_deref() != Some(TOOL_RESULT)),
    }
}

/// The fallback Claude source: session transcripts.
#[derive(Debug, Clone)]
pub struct SessionFileStore {
    projects_dir: PathBuf,
}

impl SessionFileStore {
    pub fn new(claude_dir: &Path) -> Self {
        Self {
            projects_dir: claude_dir.join("projects"),
        }
    }

    fn project_dirs(&self, scope: LogScope<'_>) -> Vec<PathBuf> {
        let token = match scope {
            LogScope::Project(identity) => identity.token(SourceId::ClaudeSessions),
            LogScope::All => None,
        };

        if let Some(encoded) = token {
            let candidate = self.projects_dir.join(encoded);
            return if candidate.is_dir() {
                vec![candidate]
            } else {
                Vec::new()
            };
        }

        let Ok(entries) = fs::read_dir(&self.projects_dir) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

impl LogStore for SessionFileStore {
    type Log = PathBuf;

    fn id(&self) -> SourceId {
        SourceId::ClaudeSessions
    }

    fn logs(&self, scope: LogScope<'_>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in self.project_dirs(scope) {
            let Ok(entries) = fs::read_dir(&dir) else {
                tracing::debug!(path = %dir.display(), "skipping unreadable project directory");
                continue;
            };
            files.extend(
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "jsonl")),
            );
        }
        files.sort();
        files
    }

    /// The first `cwd` recorded in the transcript.
    fn identify_owner(&self, log: &PathBuf) -> Option<String> {
        read_lines(log)?
            .filter(|line| line.contains("\"cwd\""))
            .filter_map(|line| parse_line::<TranscriptLine>(&line))
            .find_map(|entry| entry.cwd.filter(|c| !c.is_empty()))
    }

    fn scan_records(&self, log: &PathBuf, owner: &str) -> ScannedLog {
        let Some(lines) = read_lines(log) else {
            return ScannedLog::default();
        };
        let owner = normalize_path(owner);

        let records = lines
            .filter(|line| line.contains("\"user\""))
            .filter_map(|line| parse_line::<TranscriptLine>(&line))
            .filter(|entry| entry.kind.as_deref() == Some("user"))
            .filter(|entry| {
                entry
                    .cwd
                    .as_deref()
                    .is_none_or(|cwd| normalize_path(cwd) == owner)
            })
            .filter_map(|entry| {
                let epoch = entry
                    .timestamp
                    .as_deref()
                    .ok_or(timestamp::TimestampError::Missing)
                    .and_then(timestamp::parse_iso8601)
                    .inspect_err(|e| tracing::trace!(error = %e, "skipping transcript entry"))
                    .ok()?;
                EventRecord::new(
                    SourceId::ClaudeSessions,
                    epoch,
                    is_real_prompt(entry.message.as_ref()),
                )
                .ok()
            })
            .collect();

        ScannedLog::single_session(records)
    }
}
