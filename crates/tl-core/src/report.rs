//! Final report structures.
//!
//! Pure composition of the merger's histogram and the resolver's hints;
//! nothing is filtered or recomputed here.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Timelike};
use serde::Serialize;

use crate::cluster::{Session, SessionSummary};
use crate::pipeline::Reconciliation;
use crate::project::{ProjectQuery, basename};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Round to a fixed number of decimal places for display.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Prompt counts for one project from one tool.
#[derive(Debug, Clone, Serialize)]
pub struct PromptReport {
    pub project_path: String,
    pub total_user_messages: u64,
    pub daily: BTreeMap<String, u64>,
    pub sources: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_found: Option<usize>,
    /// Sorted epochs of every counted prompt, for cross-tool session detection.
    pub timestamps: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PromptReport {
    pub fn assemble(tool: &str, query: &ProjectQuery, result: Reconciliation) -> Self {
        let Reconciliation {
            merged,
            alternate_paths,
        } = result;

        let note = if !alternate_paths.is_empty() {
            let path = query.label();
            Some(format!(
                "No {tool} activity found at {path}, but found activity for '{}' at {} other path(s). Project may have been moved.",
                basename(path),
                alternate_paths.len()
            ))
        } else if merged.total == 0 {
            Some(format!("No matching {tool} activity found"))
        } else {
            None
        };

        let timestamps = merged.timestamps();
        Self {
            project_path: query.label().to_string(),
            total_user_messages: merged.total,
            daily: merged
                .daily
                .into_iter()
                .map(|(date, count)| (date_key(date), count))
                .collect(),
            sources: merged
                .by_source
                .into_iter()
                .map(|(source, count)| (source.breakdown_key().to_string(), count))
                .collect(),
            sessions_found: merged.sessions,
            timestamps,
            alternate_paths,
            note,
        }
    }
}

/// One clustered session, rendered.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    pub date: String,
    /// Wall-clock start in the first event's own offset.
    pub start: String,
    pub end: String,
    pub start_h: f64,
    /// End hour including the per-session overhead.
    pub end_h: f64,
    pub duration_h: f64,
    pub events: usize,
}

impl SessionRow {
    fn from_session(session: &Session, overhead_hours: f64) -> Self {
        let clock_hours = |h: u32, m: u32| f64::from(h) + f64::from(m) / 60.0;
        Self {
            date: date_key(session.date()),
            start: session.start.format("%H:%M").to_string(),
            end: session.end.format("%H:%M").to_string(),
            start_h: round_to(clock_hours(session.start.hour(), session.start.minute()), 3),
            end_h: round_to(
                clock_hours(session.end.hour(), session.end.minute()) + overhead_hours,
                3,
            ),
            duration_h: round_to(session.estimated_hours, 2),
            events: session.event_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DateSpan {
    pub first: String,
    pub last: String,
}

/// Clustered sessions and hour estimates.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub total_events: usize,
    pub total_sessions: usize,
    pub total_hours: f64,
    pub date_range: DateSpan,
    pub sessions: Vec<SessionRow>,
    pub daily_hours: BTreeMap<String, f64>,
}

impl SessionReport {
    pub fn assemble(summary: &SessionSummary, overhead_hours: f64) -> Self {
        let first = summary.sessions.first().map(|s| date_key(s.date()));
        let last = summary
            .sessions
            .last()
            .map(|s| date_key(s.end.to_utc().date_naive()));
        Self {
            total_events: summary.total_events,
            total_sessions: summary.sessions.len(),
            total_hours: round_to(summary.total_hours, 2),
            date_range: DateSpan {
                first: first.unwrap_or_default(),
                last: last.unwrap_or_default(),
            },
            sessions: summary
                .sessions
                .iter()
                .map(|s| SessionRow::from_session(s, overhead_hours))
                .collect(),
            daily_hours: summary
                .daily_hours
                .iter()
                .map(|(date, hours)| (date_key(*date), round_to(*hours, 2)))
                .collect(),
        }
    }
}
