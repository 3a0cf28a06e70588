//! Shared utilities for CLI commands.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

/// Write one pretty-printed JSON document followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("failed to serialize output")?;
    writeln!(writer)?;
    Ok(())
}

/// Render a top-level failure as `{"error": "..."}`.
pub fn write_error<W: Write>(writer: &mut W, error: &anyhow::Error) -> Result<()> {
    write_json(writer, &serde_json::json!({ "error": format!("{error:#}") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use tl_core::QueryError;

    #[test]
    fn write_error_renders_message_only() {
        let mut out = Vec::new();
        write_error(&mut out, &anyhow::Error::new(QueryError::Missing)).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
        {
          "error": "Provide --project-path or --filter"
        }
        "#);
    }

    #[test]
    fn write_error_includes_context_chain() {
        let err = anyhow::anyhow!("file not found").context("failed to load configuration");
        let mut out = Vec::new();
        write_error(&mut out, &err).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value["error"],
            "failed to load configuration: file not found"
        );
    }
}
