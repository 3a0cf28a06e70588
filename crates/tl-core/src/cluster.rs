//! Session clustering.
//!
//! Groups a chronological sequence of events into work sessions:
//! 1. The first event opens a session
//! 2. An event more than `gap_threshold_hours` after the previous one opens a new session
//! 3. Each session is estimated as its raw span plus a fixed overhead, with a floor

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Tunables for session clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Events further apart than this start a new session. Default: 1.5h.
    pub gap_threshold_hours: f64,

    /// Added to every session for startup and context switching. Default: 0.5h.
    pub overhead_hours: f64,

    /// Lower bound on a session's estimated duration. Default: 0.5h.
    pub min_session_hours: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            gap_threshold_hours: 1.5,
            overhead_hours: 0.5,
            min_session_hours: 0.5,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// Nothing to cluster; distinct from a summary that totals zero.
    #[error("no events to cluster")]
    NoEvents,
}

/// Anything with a point in time.
///
/// Lets the clusterer work on commits, prompt records, or test fixtures.
pub trait Timestamped {
    /// Returns the event time with the offset it was recorded in, if valid.
    fn timestamp(&self) -> Option<DateTime<FixedOffset>>;
}

impl Timestamped for DateTime<FixedOffset> {
    fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        Some(*self)
    }
}

/// A contiguous burst of activity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub event_count: usize,
    pub estimated_hours: f64,
}

impl Session {
    /// UTC calendar date the session is attributed to (that of its first event).
    pub fn date(&self) -> NaiveDate {
        self.start.to_utc().date_naive()
    }

    /// Span between the first and last event, in hours.
    pub fn raw_hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }
}

/// All sessions for one event sequence plus totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub sessions: Vec<Session>,
    pub total_events: usize,
    pub total_hours: f64,
    pub daily_hours: BTreeMap<NaiveDate, f64>,
}

#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond gaps between events fit in an f64"
)]
fn hours_between(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> f64 {
    (end - start).num_milliseconds() as f64 / MS_PER_HOUR
}

fn close_session(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    event_count: usize,
    config: &ClusterConfig,
) -> Session {
    let raw = if event_count == 1 {
        0.0
    } else {
        hours_between(start, end)
    };
    Session {
        start,
        end,
        event_count,
        estimated_hours: (raw + config.overhead_hours).max(config.min_session_hours),
    }
}

/// Cluster events into sessions.
///
/// Events without a valid timestamp are skipped. Input is expected in
/// chronological order; it is re-sorted so callers merging several streams
/// need not.
pub fn cluster_sessions<E: Timestamped>(
    events: &[E],
    config: &ClusterConfig,
) -> Result<SessionSummary, ClusterError> {
    let mut times: Vec<DateTime<FixedOffset>> =
        events.iter().filter_map(Timestamped::timestamp).collect();
    times.sort();

    let Some((&first, rest)) = times.split_first() else {
        return Err(ClusterError::NoEvents);
    };

    let mut sessions = Vec::new();
    let mut start = first;
    let mut last = first;
    let mut count = 1usize;

    for &ts in rest {
        if hours_between(last, ts) > config.gap_threshold_hours {
            sessions.push(close_session(start, last, count, config));
            start = ts;
            count = 0;
        }
        last = ts;
        count += 1;
    }
    sessions.push(close_session(start, last, count, config));

    let mut daily_hours: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for session in &sessions {
        *daily_hours.entry(session.date()).or_default() += session.estimated_hours;
    }
    let total_hours = sessions.iter().map(|s| s.estimated_hours).sum();

    Ok(SessionSummary {
        sessions,
        total_events: times.len(),
        total_hours,
        daily_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cluster_splits_on_gap() {
        let t = at("2026-01-29T09:00:00Z");
        let events = vec![
            t,
            t + Duration::hours(1),
            t + Duration::hours(3),
            t + Duration::minutes(190),
        ];

        let summary = cluster_sessions(&events, &ClusterConfig::default()).unwrap();

        assert_eq!(summary.sessions.len(), 2);
        assert_eq!(summary.sessions[0].start, t);
        assert_eq!(summary.sessions[0].end, t + Duration::hours(1));
        assert_eq!(summary.sessions[0].event_count, 2);
        assert_eq!(summary.sessions[1].start, t + Duration::hours(3));
        assert_eq!(summary.sessions[1].end, t + Duration::minutes(190));
        assert_eq!(summary.sessions[1].event_count, 2);
        assert_eq!(summary.total_events, 4);
    }

    #[test]
    fn test_gap_equal_to_threshold_stays_in_session() {
        let t = at("2026-01-29T09:00:00Z");
        let events = vec![t, t + Duration::minutes(90)];
        let summary = cluster_sessions(&events, &ClusterConfig::default()).unwrap();
        assert_eq!(summary.sessions.len(), 1);
    }

    #[test]
    fn test_session_duration_adds_overhead() {
        let t = at("2026-01-29T09:00:00Z");
        let events = vec![t, t + Duration::hours(1)];
        let summary = cluster_sessions(&events, &ClusterConfig::default()).unwrap();
        assert!(approx(summary.sessions[0].raw_hours(), 1.0));
        assert!(approx(summary.sessions[0].estimated_hours, 1.5));
        assert!(approx(summary.total_hours, 1.5));
    }

    #[test]
    fn test_single_event_session_uses_floor() {
        let t = at("2026-01-29T09:00:00Z");
        let summary = cluster_sessions(&[t], &ClusterConfig::default()).unwrap();
        assert!(approx(summary.sessions[0].estimated_hours, 0.5));

        let config = ClusterConfig {
            overhead_hours: 0.25,
            min_session_hours: 0.75,
            ..ClusterConfig::default()
        };
        let summary = cluster_sessions(&[t], &config).unwrap();
        assert!(approx(summary.sessions[0].estimated_hours, 0.75));

        let config = ClusterConfig {
            overhead_hours: 1.0,
            min_session_hours: 0.5,
            ..ClusterConfig::default()
        };
        let summary = cluster_sessions(&[t], &config).unwrap();
        assert!(approx(summary.sessions[0].estimated_hours, 1.0));
    }

    #[test]
    fn test_empty_input_signals_no_events() {
        let events: Vec<DateTime<FixedOffset>> = Vec::new();
        assert_eq!(
            cluster_sessions(&events, &ClusterConfig::default()),
            Err(ClusterError::NoEvents)
        );
    }

    #[test]
    fn test_session_spanning_midnight_counts_for_start_date() {
        let t = at("2026-01-29T23:30:00Z");
        let events = vec![t, t + Duration::hours(1)];
        let summary = cluster_sessions(&events, &ClusterConfig::default()).unwrap();

        assert_eq!(summary.daily_hours.len(), 1);
        let day = NaiveDate::from_ymd_opt(2026, 1, 29).unwrap();
        assert!(approx(summary.daily_hours[&day], 1.5));
    }

    #[test]
    fn test_date_attribution_is_utc() {
        // 20:00 at -05:00 is 01:00 UTC the next day.
        let t = at("2026-01-29T20:00:00-05:00");
        let summary = cluster_sessions(&[t], &ClusterConfig::default()).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();
        assert!(summary.daily_hours.contains_key(&day));
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let t = at("2026-01-29T09:00:00Z");
        let events = vec![t + Duration::hours(1), t];
        let summary = cluster_sessions(&events, &ClusterConfig::default()).unwrap();
        assert_eq!(summary.sessions.len(), 1);
        assert_eq!(summary.sessions[0].start, t);
    }

    #[test]
    fn test_custom_gap_threshold() {
        let t = at("2026-01-29T09:00:00Z");
        let events = vec![t, t + Duration::minutes(40)];
        let config = ClusterConfig {
            gap_threshold_hours: 0.5,
            ..ClusterConfig::default()
        };
        let summary = cluster_sessions(&events, &config).unwrap();
        assert_eq!(summary.sessions.len(), 2);
    }
}
