//! timelens CLI library.
//!
//! This crate provides the `tl` command-line interface over the
//! reconciliation engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, DateArgs, ProjectArgs};
pub use config::{Config, dirs_config_path};
