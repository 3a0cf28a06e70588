//! Implementation of the `tl wakatime` command.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tl_waka::{Client, read_api_key};

use super::util::write_json;
use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    project: Option<&str>,
) -> Result<()> {
    if start > end {
        anyhow::bail!("--start ({start}) is after --end ({end})");
    }

    let api_key = read_api_key(&config.wakatime_config)?;
    let mut client = Client::new(&api_key)?;
    if let Some(url) = &config.wakatime_api_url {
        client = client.with_base_url(url);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let report = runtime
        .block_on(client.report(start, end, project))
        .context("failed to fetch WakaTime data")?;

    write_json(writer, &report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn config_with_key_file(temp: &TempDir, contents: Option<&str>) -> Config {
        let path = temp.path().join(".wakatime.cfg");
        if let Some(contents) = contents {
            std::fs::write(&path, contents).unwrap();
        }
        Config {
            wakatime_config: path,
            ..Config::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn wakatime_rejects_inverted_range() {
        let temp = TempDir::new().unwrap();
        let config = config_with_key_file(&temp, Some("[settings]\napi_key = k\n"));
        let err = run(
            &mut Vec::new(),
            &config,
            date("2026-02-01"),
            date("2026-01-01"),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is after"));
    }

    #[test]
    fn wakatime_requires_api_key() {
        let temp = TempDir::new().unwrap();
        let config = config_with_key_file(&temp, None);
        let err = run(
            &mut Vec::new(),
            &config,
            date("2026-01-01"),
            date("2026-01-02"),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("no WakaTime API key found"));
    }
}
