//! Core reconciliation engine for timelens.
//!
//! This crate contains:
//! - Timestamp normalization across ISO strings and epoch seconds/millis
//! - The two-phase source adapter contract and the Claude and Codex adapters
//! - Project identity resolution and moved-project discovery
//! - The deduplicating merge of primary and fallback streams
//! - Gap-based session clustering over prompts or git commits

pub mod claude;
pub mod cluster;
pub mod codex;
pub mod event;
pub mod git;
mod merge;
mod pipeline;
pub mod project;
pub mod report;
pub mod source;
pub mod timestamp;

pub use cluster::{ClusterConfig, ClusterError, Session, SessionSummary, Timestamped, cluster_sessions};
pub use event::{EventRecord, SourceId};
pub use merge::{MergedCounts, merge_streams};
pub use pipeline::{DynSource, Reconciliation, reconcile};
pub use project::{ProjectIdentity, ProjectQuery, QueryError};
pub use report::{PromptReport, SessionReport};
pub use source::{LogScope, LogStore, ScannedLog, Source, SourceScan};
pub use timestamp::TimestampError;
