//! Deduplicating merge of a primary stream with fallback streams.
//!
//! The primary source is trusted unconditionally: every record counts and
//! claims its rounded epoch. Fallback records count only when they are real
//! user input and their rounded epoch is still unclaimed. Each accepted
//! fallback record claims its epoch too, so later fallbacks cannot count the
//! same event again.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::event::{EventRecord, SourceId};
use crate::source::SourceScan;

/// Daily histogram and per-source breakdown of counted events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedCounts {
    pub daily: BTreeMap<NaiveDate, u64>,
    pub total: u64,
    /// Counted events per participating source, zero entries included.
    pub by_source: BTreeMap<SourceId, u64>,
    /// Every counted event, sorted by epoch.
    pub counted: Vec<EventRecord>,
    /// Sum of sessions over sources that define them.
    pub sessions: Option<usize>,
}

impl MergedCounts {
    fn count(&mut self, record: &EventRecord) -> bool {
        let Some(date) = record.utc_date() else {
            tracing::trace!(epoch = record.epoch_seconds, "dropping record without a date");
            return false;
        };
        *self.daily.entry(date).or_default() += 1;
        *self.by_source.entry(record.source).or_default() += 1;
        self.total += 1;
        self.counted.push(*record);
        true
    }

    fn sort_counted(&mut self) {
        self.counted
            .sort_by(|a, b| a.epoch_seconds.total_cmp(&b.epoch_seconds));
    }

    /// Epochs of every counted event, sorted.
    pub fn timestamps(&self) -> Vec<f64> {
        self.counted.iter().map(|r| r.epoch_seconds).collect()
    }

    /// The same counts restricted to events whose UTC date passes `keep`.
    ///
    /// Sources and session counts carry over; per-source counts are recomputed.
    #[must_use]
    pub fn retain_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        let mut kept = Self {
            by_source: self.by_source.keys().map(|&source| (source, 0)).collect(),
            sessions: self.sessions,
            ..Self::default()
        };
        for record in &self.counted {
            if record.utc_date().is_some_and(&keep) {
                kept.count(record);
            }
        }
        kept
    }

    /// Add another merged result (a different tool) without deduplication.
    pub fn absorb(&mut self, other: &Self) {
        for (date, count) in &other.daily {
            *self.daily.entry(*date).or_default() += count;
        }
        for (source, count) in &other.by_source {
            *self.by_source.entry(*source).or_default() += count;
        }
        self.total += other.total;
        self.counted.extend_from_slice(&other.counted);
        self.sort_counted();
        self.sessions = match (self.sessions, other.sessions) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}

/// Merge one primary stream with fallback streams in priority order.
///
/// All streams must be fully materialized before calling this.
pub fn merge_streams(primary: &SourceScan, fallbacks: &[SourceScan]) -> MergedCounts {
    let mut merged = MergedCounts::default();
    let mut seen: HashSet<i64> = HashSet::new();

    merged.by_source.insert(primary.source, 0);
    for record in &primary.records {
        seen.insert(record.dedup_key());
        merged.count(record);
    }

    for fallback in fallbacks {
        merged.by_source.entry(fallback.source).or_insert(0);
        for record in &fallback.records {
            if !record.is_real_prompt {
                continue;
            }
            if seen.insert(record.dedup_key()) {
                merged.count(record);
            }
        }
    }

    merged.sort_counted();
    merged.sessions = std::iter::once(primary)
        .chain(fallbacks)
        .filter_map(|scan| scan.sessions)
        .reduce(|a, b| a + b);

    merged
}
