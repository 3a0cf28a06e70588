//! Cursor IDE prompt sources.
//!
//! Primary: the global `cursorDiskKV` table. `composerData:<id>` rows name
//! the workspace a composer session was opened in; `bubbleId:<id>:<msg>`
//! rows are individual messages, with user prompts marked `type == 1`.
//!
//! Fallback: per-workspace `state.vscdb` files. They carry only session-level
//! composer timestamps plus per-message timestamps from the legacy chat panel.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tl_core::project::uri_to_path;
use tl_core::source::{LogScope, LogStore, ScannedLog};
use tl_core::timestamp;
use tl_core::{EventRecord, SourceId};

use crate::{KvTable, StateDb, StoreError};

const COMPOSER_PREFIX: &str = "composerData:";
const COMPOSER_KEY: &str = "composer.composerData";
const LEGACY_CHAT_KEYS: &[&str] = &[
    "workbench.panel.aichat.view.aichat.chatdata",
    "workbench.panel.chat.view.chat.chatdata",
];

/// Bubble `type` marking a user message.
const USER_BUBBLE: i64 = 1;

/// `timingInfo` fields, in the order they are trusted.
const TIMING_FIELDS: &[&str] = &[
    "clientStartTime",
    "clientRpcSendTime",
    "clientSettleTime",
    "clientEndTime",
];

/// Platform default for Cursor's `User` data directory.
pub fn default_cursor_dir(home: &Path, config_dir: Option<&Path>) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library/Application Support/Cursor/User")
    } else {
        config_dir
            .map_or_else(|| home.join(".config"), Path::to_path_buf)
            .join("Cursor")
            .join("User")
    }
}

fn log_store_error(path: &Path, error: &StoreError) {
    match error {
        StoreError::Missing(_) => tracing::debug!(path = %path.display(), "no state database"),
        StoreError::Sqlite(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read state database");
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Option<T> {
    serde_json::from_str(raw)
        .inspect_err(|e| tracing::trace!(error = %e, what, "skipping malformed value"))
        .ok()
}

// ========== global storage ==========

/// One composer session from global storage.
#[derive(Debug, Clone)]
pub struct Composer {
    pub id: String,
    pub workspace_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposerData {
    workspace_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bubble {
    #[serde(rename = "type")]
    kind: Option<Value>,
    created_at: Option<Value>,
    timing_info: Option<serde_json::Map<String, Value>>,
    timestamp: Option<Value>,
}

impl Bubble {
    fn is_user(&self) -> bool {
        self.kind.as_ref().and_then(Value::as_i64) == Some(USER_BUBBLE)
    }

    /// Resolve the bubble's time: ISO `createdAt`, then `timingInfo`
    /// millisecond fields, then the legacy millisecond `timestamp`.
    fn epoch(&self) -> Option<f64> {
        let created = self
            .created_at
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| timestamp::parse_iso8601(s).ok());

        let timing = || {
            self.timing_info.as_ref().and_then(|timing| {
                TIMING_FIELDS
                    .iter()
                    .filter_map(|field| timing.get(*field).and_then(Value::as_f64))
                    .find_map(timestamp::from_epoch_millis)
            })
        };

        created.or_else(timing).or_else(|| {
            self.timestamp
                .as_ref()
                .and_then(Value::as_f64)
                .and_then(timestamp::from_epoch_millis)
        })
    }
}

/// The primary Cursor source.
#[derive(Debug, Clone)]
pub struct GlobalStore {
    db_path: PathBuf,
}

impl GlobalStore {
    pub fn new(cursor_dir: &Path) -> Self {
        Self {
            db_path: cursor_dir.join("globalStorage").join("state.vscdb"),
        }
    }

    fn read_composers(&self) -> Result<Vec<Composer>, StoreError> {
        let db = StateDb::open_read_only(&self.db_path)?;
        let rows = db.scan_prefix(KvTable::CursorDiskKv, COMPOSER_PREFIX)?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| {
                let id = key.strip_prefix(COMPOSER_PREFIX)?.to_string();
                let data: ComposerData = parse_json(&value, "composer")?;
                let workspace_path = data
                    .workspace_uri
                    .filter(|uri| !uri.is_empty())
                    .map(|uri| uri_to_path(&uri));
                Some(Composer { id, workspace_path })
            })
            .collect())
    }

    fn read_bubbles(&self, composer: &Composer) -> Result<Vec<f64>, StoreError> {
        let db = StateDb::open_read_only(&self.db_path)?;
        let prefix = format!("bubbleId:{}:", composer.id);
        Ok(db
            .scan_prefix(KvTable::CursorDiskKv, &prefix)?
            .into_iter()
            .filter_map(|(_, value)| parse_json::<Bubble>(&value, "bubble"))
            .filter(Bubble::is_user)
            .filter_map(|bubble| bubble.epoch())
            .collect())
    }
}

impl LogStore for GlobalStore {
    type Log = Composer;

    fn id(&self) -> SourceId {
        SourceId::CursorGlobal
    }

    fn logs(&self, _scope: LogScope<'_>) -> Vec<Composer> {
        self.read_composers().unwrap_or_else(|e| {
            log_store_error(&self.db_path, &e);
            Vec::new()
        })
    }

    fn identify_owner(&self, log: &Composer) -> Option<String> {
        log.workspace_path.clone()
    }

    fn scan_records(&self, log: &Composer, _owner: &str) -> ScannedLog {
        let epochs = self.read_bubbles(log).unwrap_or_else(|e| {
            log_store_error(&self.db_path, &e);
            Vec::new()
        });
        ScannedLog::single_session(
            epochs
                .into_iter()
                .filter_map(|epoch| EventRecord::new(SourceId::CursorGlobal, epoch, true).ok())
                .collect(),
        )
    }
}

// ========== workspace storage ==========

/// One `workspaceStorage/<hash>` directory and the folder it was opened on.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub dir: PathBuf,
    pub folder: String,
}

#[derive(Debug, Deserialize)]
struct WorkspaceJson {
    folder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposerIndex {
    #[serde(default)]
    all_composers: Vec<ComposerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposerEntry {
    created_at: Option<Value>,
    last_updated_at: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyChat {
    chat_sessions: Option<Vec<LegacyTab>>,
    tabs: Option<Vec<LegacyTab>>,
}

#[derive(Debug, Deserialize)]
struct LegacyTab {
    messages: Option<Vec<LegacyMessage>>,
    bubbles: Option<Vec<LegacyMessage>>,
}

#[derive(Debug, Deserialize)]
struct LegacyMessage {
    role: Option<String>,
    timestamp: Option<Value>,
}

fn millis(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).and_then(timestamp::from_epoch_millis)
}

/// Composer timestamps and session count from `composer.composerData`.
fn composer_epochs(raw: &str) -> (Vec<f64>, usize) {
    let index: ComposerIndex = parse_json(raw, "composer index").unwrap_or_default();
    let mut epochs = Vec::new();
    let mut sessions = 0;
    for composer in &index.all_composers {
        let found: Vec<f64> = [&composer.created_at, &composer.last_updated_at]
            .into_iter()
            .filter_map(|v| millis(v.as_ref()))
            .collect();
        if !found.is_empty() {
            sessions += 1;
        }
        epochs.extend(found);
    }
    (epochs, sessions)
}

/// User message timestamps and tab count from a legacy chat panel value.
fn legacy_epochs(raw: &str) -> (Vec<f64>, usize) {
    let chat: LegacyChat = parse_json(raw, "legacy chat").unwrap_or_default();
    let tabs = chat.chat_sessions.or(chat.tabs).unwrap_or_default();
    let mut epochs = Vec::new();
    let mut sessions = 0;
    for tab in tabs {
        let found: Vec<f64> = tab
            .messages
            .or(tab.bubbles)
            .unwrap_or_default()
            .iter()
            .filter(|m| m.role.as_deref() == Some("user"))
            .filter_map(|m| millis(m.timestamp.as_ref()))
            .collect();
        if !found.is_empty() {
            sessions += 1;
        }
        epochs.extend(found);
    }
    (epochs, sessions)
}

/// The fallback Cursor source.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
}

impl WorkspaceStore {
    pub fn new(cursor_dir: &Path) -> Self {
        Self {
            root: cursor_dir.join("workspaceStorage"),
        }
    }

    fn read_workspace(dir: PathBuf) -> Option<Workspace> {
        let raw = fs::read_to_string(dir.join("workspace.json")).ok()?;
        let folder = parse_json::<WorkspaceJson>(&raw, "workspace.json")?
            .folder
            .filter(|f| !f.is_empty())?;
        Some(Workspace {
            dir,
            folder: uri_to_path(&folder),
        })
    }

    fn read_epochs(workspace: &Workspace) -> Result<(Vec<f64>, usize), StoreError> {
        let db = StateDb::open_read_only(&workspace.dir.join("state.vscdb"))?;
        let mut epochs = Vec::new();
        let mut sessions = 0;

        if let Some(raw) = db.get(KvTable::ItemTable, COMPOSER_KEY)? {
            let (found, count) = composer_epochs(&raw);
            epochs.extend(found);
            sessions += count;
        }
        for key in LEGACY_CHAT_KEYS {
            if let Some(raw) = db.get(KvTable::ItemTable, key)? {
                let (found, count) = legacy_epochs(&raw);
                epochs.extend(found);
                sessions += count;
            }
        }
        Ok((epochs, sessions))
    }
}

impl LogStore for WorkspaceStore {
    type Log = Workspace;

    fn id(&self) -> SourceId {
        SourceId::CursorWorkspace
    }

    fn logs(&self, _scope: LogScope<'_>) -> Vec<Workspace> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            tracing::debug!(path = %self.root.display(), "no workspace storage");
            return Vec::new();
        };
        let mut workspaces: Vec<Workspace> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter_map(Self::read_workspace)
            .collect();
        workspaces.sort_by(|a, b| a.dir.cmp(&b.dir));
        workspaces
    }

    fn identify_owner(&self, log: &Workspace) -> Option<String> {
        Some(log.folder.clone())
    }

    fn scan_records(&self, log: &Workspace, _owner: &str) -> ScannedLog {
        let (epochs, sessions) = Self::read_epochs(log).unwrap_or_else(|e| {
            log_store_error(&log.dir, &e);
            (Vec::new(), 0)
        });
        ScannedLog {
            records: epochs
                .into_iter()
                .filter_map(|epoch| EventRecord::new(SourceId::CursorWorkspace, epoch, true).ok())
                .collect(),
            sessions,
        }
    }
}
