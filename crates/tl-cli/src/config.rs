//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tl_core::ClusterConfig;
use tl_db::cursor::default_cursor_dir;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Claude Code data directory (`history.jsonl`, `projects/`).
    pub claude_dir: PathBuf,
    /// Codex CLI data directory (`sessions/`).
    pub codex_dir: PathBuf,
    /// Cursor `User` directory (`globalStorage/`, `workspaceStorage/`).
    pub cursor_dir: PathBuf,
    /// WakaTime plugin config holding the API key.
    pub wakatime_config: PathBuf,
    /// Override for self-hosted WakaTime-compatible servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wakatime_api_url: Option<String>,
    /// Session clustering parameters.
    #[serde(default)]
    pub clustering: ClusterConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("claude_dir", &self.claude_dir)
            .field("codex_dir", &self.codex_dir)
            .field("cursor_dir", &self.cursor_dir)
            .field("wakatime_config", &self.wakatime_config)
            .field("wakatime_api_url", &self.wakatime_api_url)
            .field("clustering", &self.clustering)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            claude_dir: home.join(".claude"),
            codex_dir: home.join(".codex"),
            cursor_dir: default_cursor_dir(&home, dirs::config_dir().as_deref()),
            wakatime_config: home.join(".wakatime.cfg"),
            wakatime_api_url: None,
            clustering: ClusterConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, the user config file, `config_path`, then
    /// `TL_*` environment variables (`TL_CLUSTERING__GAP_THRESHOLD_HOURS`
    /// reaches nested keys).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TL_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for timelens.
///
/// On Linux: `~/.config/timelens`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("timelens"))
}
