//! WakaTime API integration for timelens.
//!
//! Provides:
//! - Day-bucketed coding time from the summaries endpoint
//! - Merged activity intervals from the per-day durations endpoint
//! - API key discovery from the `~/.wakatime.cfg` file the editor plugins write

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const WAKATIME_API_URL: &str = "https://api.wakatime.com/api/v1";
const USER_AGENT: &str = concat!("timelens/", env!("CARGO_PKG_VERSION"));

/// Intervals closer than this are one stretch of activity (file switches).
pub const MERGE_TOLERANCE_SECS: f64 = 60.0;

/// WakaTime client errors.
#[derive(Debug, Error)]
pub enum WakaError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// No API key in the config file.
    #[error("no WakaTime API key found in {}", .0.display())]
    MissingApiKey(PathBuf),
    /// Failed to read the config file.
    #[error("failed to read {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// WakaTime API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    authorization: String,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: &str) -> Result<Self, WakaError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(WakaError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(WakaError::ClientBuild)?;

        Ok(Self {
            http,
            authorization: format!("Basic {}", BASE64.encode(api_key)),
            base_url: WAKATIME_API_URL.to_string(),
        })
    }

    /// Point the client at a different API root (self-hosted servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, WakaError> {
        let response = self
            .http
            .get(format!("{}{endpoint}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WakaError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }
        Ok(body)
    }

    /// Daily and per-project totals over an inclusive date range.
    pub async fn summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        project: Option<&str>,
    ) -> Result<SummaryReport, WakaError> {
        let mut query = vec![("start", start.to_string()), ("end", end.to_string())];
        if let Some(project) = project {
            query.push(("project", project.to_string()));
        }
        let body = self.get("/users/current/summaries", &query).await?;
        parse_summaries(&body, start, end)
    }

    /// Raw activity intervals for one day.
    pub async fn durations(
        &self,
        date: NaiveDate,
        project: Option<&str>,
    ) -> Result<Vec<Interval>, WakaError> {
        let mut query = vec![("date", date.to_string())];
        if let Some(project) = project {
            query.push(("project", project.to_string()));
        }
        let body = self.get("/users/current/durations", &query).await?;
        parse_durations(&body)
    }

    /// Summaries plus merged intervals for every day with activity.
    ///
    /// Durations are only requested for active days, concurrently. A failed
    /// day is logged and skipped rather than failing the whole report.
    pub async fn report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        project: Option<&str>,
    ) -> Result<SummaryReport, WakaError> {
        let mut report = self.summaries(start, end, project).await?;

        let mut tasks = tokio::task::JoinSet::new();
        for day in &report.daily {
            let Ok(date) = day.date.parse::<NaiveDate>() else {
                tracing::debug!(date = %day.date, "skipping summary day without a date");
                continue;
            };
            let client = self.clone();
            let project = project.map(str::to_string);
            tasks.spawn(async move {
                let result = client.durations(date, project.as_deref()).await;
                (date, result)
            });
        }

        let mut intervals = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(found))) => intervals.extend(found),
                Ok((date, Err(e))) => {
                    tracing::warn!(%date, error = %e, "failed to fetch durations");
                }
                Err(e) => tracing::warn!(error = %e, "durations task failed"),
            }
        }

        report.intervals = merge_intervals(intervals);
        Ok(report)
    }
}

/// One activity stretch as `[start, end]` epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval(pub f64, pub f64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyHours {
    pub date: String,
    pub hours: f64,
    /// WakaTime's own human-readable rendering, e.g. `2 hrs 5 mins`.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectHours {
    pub project: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_hours: f64,
    /// Days with non-zero activity only.
    pub daily: Vec<DailyHours>,
    /// Sorted by hours, most first.
    pub projects: Vec<ProjectHours>,
    pub intervals: Vec<Interval>,
}

#[derive(Debug, Deserialize)]
struct SummariesResponse {
    #[serde(default)]
    data: Vec<DaySummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaySummary {
    range: DayRange,
    grand_total: GrandTotal,
    projects: Vec<ProjectTotal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DayRange {
    date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GrandTotal {
    total_seconds: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ProjectTotal {
    name: Option<String>,
    #[serde(default)]
    total_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct DurationsResponse {
    #[serde(default)]
    data: Vec<DurationEntry>,
}

#[derive(Debug, Deserialize)]
struct DurationEntry {
    time: Option<f64>,
    duration: Option<f64>,
}

fn hours(seconds: f64) -> f64 {
    (seconds / 3600.0 * 100.0).round() / 100.0
}

fn parse_summaries(body: &str, start: NaiveDate, end: NaiveDate) -> Result<SummaryReport, WakaError> {
    let response: SummariesResponse =
        serde_json::from_str(body).map_err(|err| WakaError::InvalidResponse(err.to_string()))?;

    let mut total_seconds = 0.0;
    let mut daily = Vec::new();
    let mut by_project: BTreeMap<String, f64> = BTreeMap::new();

    for day in response.data {
        let seconds = day.grand_total.total_seconds;
        total_seconds += seconds;
        if seconds > 0.0 {
            daily.push(DailyHours {
                date: day.range.date,
                hours: hours(seconds),
                text: day.grand_total.text,
            });
        }
        for project in day.projects {
            let name = project.name.unwrap_or_else(|| "unknown".to_string());
            *by_project.entry(name).or_default() += project.total_seconds;
        }
    }

    let mut projects: Vec<(String, f64)> = by_project.into_iter().collect();
    projects.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(SummaryReport {
        start,
        end,
        total_hours: hours(total_seconds),
        daily,
        projects: projects
            .into_iter()
            .map(|(project, seconds)| ProjectHours {
                project,
                hours: hours(seconds),
            })
            .collect(),
        intervals: Vec::new(),
    })
}

fn parse_durations(body: &str) -> Result<Vec<Interval>, WakaError> {
    let response: DurationsResponse =
        serde_json::from_str(body).map_err(|err| WakaError::InvalidResponse(err.to_string()))?;
    Ok(response
        .data
        .into_iter()
        .filter_map(|entry| {
            let time = entry.time.filter(|t| *t > 0.0)?;
            let duration = entry.duration.filter(|d| *d > 0.0)?;
            Some(Interval(time, time + duration))
        })
        .collect())
}

/// Sort and merge overlapping intervals, bridging gaps up to the tolerance.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for Interval(start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 + MERGE_TOLERANCE_SECS => last.1 = last.1.max(end),
            _ => merged.push(Interval(start, end)),
        }
    }
    merged
}

/// Read `api_key` from the `[settings]` section of a WakaTime config file.
pub fn read_api_key(path: &Path) -> Result<String, WakaError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WakaError::MissingApiKey(path.to_path_buf()));
        }
        Err(source) => {
            return Err(WakaError::Config {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut in_settings = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_settings = section.trim() == "settings";
            continue;
        }
        if !in_settings {
            continue;
        }
        let Some((key, value)) = line.split_once(['=', ':']) else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("api_key") && !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
    }

    Err(WakaError::MissingApiKey(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn client_rejects_empty_api_key() {
        assert!(matches!(
            Client::new("  "),
            Err(WakaError::InvalidApiKey { .. })
        ));
    }

    #[test]
    fn client_debug_redacts_api_key() {
        let client = Client::new("waka_secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("waka_secret"));
        assert!(!debug.contains(&BASE64.encode("waka_secret")));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn parse_summaries_aggregates_days_and_projects() {
        let body = r#"{
            "data": [
                {"range": {"date": "2026-01-28"}, "grand_total": {"total_seconds": 0, "text": "0 secs"}, "projects": []},
                {"range": {"date": "2026-01-29"}, "grand_total": {"total_seconds": 7200, "text": "2 hrs"},
                 "projects": [{"name": "app", "total_seconds": 5400}, {"name": "tools", "total_seconds": 1800}]},
                {"range": {"date": "2026-01-30"}, "grand_total": {"total_seconds": 1800, "text": "30 mins"},
                 "projects": [{"name": "tools", "total_seconds": 1800}, {"total_seconds": 0}]}
            ]
        }"#;

        let report = parse_summaries(body, date("2026-01-28"), date("2026-01-30")).unwrap();

        assert!((report.total_hours - 2.5).abs() < 1e-9);
        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.daily[0].date, "2026-01-29");
        assert_eq!(report.daily[0].text, "2 hrs");
        let names: Vec<&str> = report.projects.iter().map(|p| p.project.as_str()).collect();
        assert_eq!(names, vec!["app", "tools", "unknown"]);
        assert!((report.projects[1].hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parse_summaries_rejects_invalid_json() {
        let err = parse_summaries("<html>", date("2026-01-28"), date("2026-01-30")).unwrap_err();
        assert!(matches!(err, WakaError::InvalidResponse(_)));
    }

    #[test]
    fn parse_durations_drops_empty_entries() {
        let body = r#"{"data": [
            {"time": 1769680800.0, "duration": 120.5, "project": "app"},
            {"time": 1769681000.0, "duration": 0},
            {"duration": 30}
        ]}"#;
        assert_eq!(
            parse_durations(body).unwrap(),
            vec![Interval(1_769_680_800.0, 1_769_680_920.5)]
        );
    }

    #[test]
    fn merge_intervals_bridges_short_gaps() {
        let merged = merge_intervals(vec![
            Interval(1000.0, 1100.0),
            Interval(0.0, 100.0),
            Interval(150.0, 200.0),
            Interval(260.0, 300.0),
            Interval(50.0, 80.0),
        ]);
        assert_eq!(merged, vec![Interval(0.0, 300.0), Interval(1000.0, 1100.0)]);
    }

    #[test]
    fn merge_intervals_keeps_gaps_over_tolerance() {
        let merged = merge_intervals(vec![Interval(0.0, 100.0), Interval(160.5, 200.0)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn interval_serializes_as_pair() {
        let json = serde_json::to_string(&Interval(1.0, 2.5)).unwrap();
        assert_eq!(json, "[1.0,2.5]");
    }

    #[test]
    fn read_api_key_from_settings_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".wakatime.cfg");
        std::fs::write(
            &path,
            "[other]\napi_key = wrong\n\n[settings]\n; comment\ndebug = false\napi_key = waka_1234\n",
        )
        .unwrap();
        assert_eq!(read_api_key(&path).unwrap(), "waka_1234");
    }

    #[test]
    fn read_api_key_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".wakatime.cfg");
        assert!(matches!(
            read_api_key(&path),
            Err(WakaError::MissingApiKey(_))
        ));

        std::fs::write(&path, "[settings]\ndebug = true\n").unwrap();
        assert!(matches!(
            read_api_key(&path),
            Err(WakaError::MissingApiKey(_))
        ));
    }
}
