//! CLI subcommand implementations.

pub mod claude;
pub mod codex;
pub mod cursor;
pub mod git;
pub mod timeline;
pub mod util;
pub mod wakatime;
