//! Event records produced by source adapters.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::Timestamped;
use crate::timestamp::{self, TimestampError};

/// Telemetry source that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// `~/.claude/history.jsonl`, one line per submitted prompt.
    ClaudeHistory,
    /// `~/.claude/projects/<encoded>/*.jsonl` session transcripts.
    ClaudeSessions,
    /// `~/.codex/sessions/**/rollout-*.jsonl`.
    Codex,
    /// Cursor global `state.vscdb` (`cursorDiskKV` table).
    CursorGlobal,
    /// Cursor per-workspace `state.vscdb` (`ItemTable`).
    CursorWorkspace,
    /// `git log` of the project repository.
    Git,
}

impl SourceId {
    pub const ALL: [Self; 6] = [
        Self::ClaudeHistory,
        Self::ClaudeSessions,
        Self::Codex,
        Self::CursorGlobal,
        Self::CursorWorkspace,
        Self::Git,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeHistory => "claude_history",
            Self::ClaudeSessions => "claude_sessions",
            Self::Codex => "codex",
            Self::CursorGlobal => "cursor_global",
            Self::CursorWorkspace => "cursor_workspace",
            Self::Git => "git",
        }
    }

    /// Short label used in the per-source breakdown of a report.
    #[must_use]
    pub const fn breakdown_key(&self) -> &'static str {
        match self {
            Self::ClaudeHistory => "history",
            Self::ClaudeSessions => "session_files",
            Self::Codex => "rollouts",
            Self::CursorGlobal => "global_storage",
            Self::CursorWorkspace => "workspace_storage",
            Self::Git => "commits",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single candidate activity event.
///
/// Exists only for the duration of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub source: SourceId,
    pub epoch_seconds: f64,
    /// Genuine user input, as opposed to a tool-result echo.
    pub is_real_prompt: bool,
}

impl EventRecord {
    /// Build a record from an already-normalized epoch, validating its range.
    pub fn new(
        source: SourceId,
        epoch_seconds: f64,
        is_real_prompt: bool,
    ) -> Result<Self, TimestampError> {
        if timestamp::epoch_to_datetime(epoch_seconds).is_none() {
            return Err(TimestampError::OutOfRange(epoch_seconds));
        }
        Ok(Self {
            source,
            epoch_seconds,
            is_real_prompt,
        })
    }

    /// Rounded epoch used to recognize the same event reported by two sources.
    pub fn dedup_key(&self) -> i64 {
        timestamp::rounded_epoch(self.epoch_seconds)
    }

    pub fn utc_date(&self) -> Option<NaiveDate> {
        timestamp::utc_date(self.epoch_seconds)
    }
}

impl Timestamped for EventRecord {
    fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        timestamp::epoch_to_datetime(self.epoch_seconds).map(|dt: DateTime<Utc>| dt.fixed_offset())
    }
}
