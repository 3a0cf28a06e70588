//! The adapter contract shared by every telemetry source.
//!
//! Adapters are two-phase: [`LogStore::identify_owner`] decides which project
//! a log unit (a session file, a composer, a group of history lines) belongs
//! to, and only logs owned by the requested project reach
//! [`LogStore::scan_records`]. A record is never emitted from a log owned by
//! another project.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::event::{EventRecord, SourceId};
use crate::project::ProjectIdentity;

/// Which logs an adapter should enumerate.
#[derive(Debug, Clone, Copy)]
pub enum LogScope<'a> {
    /// Logs that may belong to this project; adapters may narrow by token.
    Project(&'a ProjectIdentity),
    /// Every log in the store, for alternate-path discovery.
    All,
}

/// Records parsed from one log unit.
#[derive(Debug, Clone, Default)]
pub struct ScannedLog {
    pub records: Vec<EventRecord>,
    /// Source-defined sessions contained in this log.
    pub sessions: usize,
}

impl ScannedLog {
    /// A log that is one session when it yielded anything.
    pub fn single_session(records: Vec<EventRecord>) -> Self {
        let sessions = usize::from(!records.is_empty());
        Self { records, sessions }
    }
}

/// Output of one adapter for one project.
#[derive(Debug, Clone)]
pub struct SourceScan {
    pub source: SourceId,
    /// Sorted by epoch.
    pub records: Vec<EventRecord>,
    /// `None` where the source has no notion of a session.
    pub sessions: Option<usize>,
}

/// A store of append-only logs read by one adapter.
pub trait LogStore: Sync {
    /// One unit of ownership: a file, a composer session, a history group.
    type Log: Send + Sync;

    fn id(&self) -> SourceId;

    /// Enumerate log units. Missing or unreadable stores yield nothing.
    fn logs(&self, scope: LogScope<'_>) -> Vec<Self::Log>;

    /// The project path a log belongs to, if it can be determined.
    fn identify_owner(&self, log: &Self::Log) -> Option<String>;

    /// Parse all records of a log already known to belong to `owner`.
    fn scan_records(&self, log: &Self::Log, owner: &str) -> ScannedLog;

    /// Whether this source defines sessions at all.
    fn counts_sessions(&self) -> bool {
        true
    }
}

/// The polymorphic scanning capability used by the reconciliation pipeline.
pub trait Source {
    fn id(&self) -> SourceId;

    /// Collect every record owned by the requested project.
    fn scan(&self, identity: &ProjectIdentity) -> SourceScan;

    /// Every project path this source's store knows about.
    fn known_projects(&self) -> BTreeSet<String>;
}

impl<T: LogStore> Source for T {
    fn id(&self) -> SourceId {
        LogStore::id(self)
    }

    fn scan(&self, identity: &ProjectIdentity) -> SourceScan {
        let logs = self.logs(LogScope::Project(identity));

        let batches: Vec<ScannedLog> = logs
            .par_iter()
            .filter_map(|log| {
                let owner = self.identify_owner(log)?;
                if !identity.matches(&owner) {
                    return None;
                }
                Some(self.scan_records(log, &owner))
            })
            .collect();

        let sessions = batches.iter().map(|b| b.sessions).sum();
        let mut records: Vec<EventRecord> =
            batches.into_iter().flat_map(|b| b.records).collect();
        records.sort_by(|a, b| a.epoch_seconds.total_cmp(&b.epoch_seconds));

        tracing::debug!(
            source = %LogStore::id(self),
            logs = logs.len(),
            records = records.len(),
            "scanned source"
        );

        SourceScan {
            source: LogStore::id(self),
            records,
            sessions: self.counts_sessions().then_some(sessions),
        }
    }

    fn known_projects(&self) -> BTreeSet<String> {
        self.logs(LogScope::All)
            .par_iter()
            .filter_map(|log| self.identify_owner(log))
            .filter(|owner| !owner.is_empty())
            .collect()
    }
}
