//! Project identity resolution.
//!
//! A caller asks about either an exact project path or a basename filter.
//! Each store keys projects differently (an encoded directory name, a
//! `file://` URI, the raw path), so the resolver derives one token per
//! source. When a concrete path matches nothing, [`find_alternate_paths`]
//! looks for the same basename elsewhere: the project may have moved.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::event::SourceId;

/// Substitution character for directory-encoded stores.
const ENCODED_SEPARATOR: char = '-';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Provide --project-path or --filter")]
    Missing,
    #[error("Provide only one of --project-path or --filter")]
    Ambiguous,
}

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectQuery {
    /// Exact match on a normalized absolute path.
    Path(String),
    /// Case-insensitive substring match on the basename.
    Filter(String),
}

impl ProjectQuery {
    /// Build a query from CLI arguments; exactly one must be non-empty.
    pub fn from_args(path: Option<&str>, filter: Option<&str>) -> Result<Self, QueryError> {
        let path = path.map(str::trim).filter(|p| !p.is_empty());
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        match (path, filter) {
            (Some(_), Some(_)) => Err(QueryError::Ambiguous),
            (Some(path), None) => Ok(Self::Path(normalize_path(path))),
            (None, Some(filter)) => Ok(Self::Filter(filter.to_string())),
            (None, None) => Err(QueryError::Missing),
        }
    }

    /// Whether a project path recorded by a store belongs to this query.
    pub fn matches(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        match self {
            Self::Path(path) => normalize_path(candidate) == *path,
            Self::Filter(filter) => {
                let name = basename(candidate);
                !name.is_empty() && name.to_lowercase().contains(&filter.to_lowercase())
            }
        }
    }

    /// The path or filter as given, for display.
    pub fn label(&self) -> &str {
        match self {
            Self::Path(s) | Self::Filter(s) => s,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::Filter(_) => None,
        }
    }
}

/// A resolved query with one identity token per source.
///
/// Filters carry no tokens: every adapter falls back to basename matching.
#[derive(Debug, Clone)]
pub struct ProjectIdentity {
    requested: ProjectQuery,
    tokens: BTreeMap<SourceId, String>,
}

impl ProjectIdentity {
    pub fn resolve(requested: ProjectQuery) -> Self {
        let tokens = match &requested {
            ProjectQuery::Path(path) => SourceId::ALL
                .into_iter()
                .map(|source| (source, source_token(source, path)))
                .collect(),
            ProjectQuery::Filter(_) => BTreeMap::new(),
        };
        Self { requested, tokens }
    }

    pub const fn requested(&self) -> &ProjectQuery {
        &self.requested
    }

    pub fn token(&self, source: SourceId) -> Option<&str> {
        self.tokens.get(&source).map(String::as_str)
    }

    pub fn matches(&self, owner: &str) -> bool {
        self.requested.matches(owner)
    }
}

/// Derive the store-specific key for a normalized path.
pub fn source_token(source: SourceId, path: &str) -> String {
    match source {
        SourceId::ClaudeSessions => encode_dir_name(path),
        SourceId::CursorGlobal => path_to_uri(path),
        SourceId::ClaudeHistory | SourceId::Codex | SourceId::CursorWorkspace | SourceId::Git => {
            path.to_string()
        }
    }
}

/// Lexically normalize a path: collapse `.`, resolve `..`, drop trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !absolute => parts.push(".."),
                _ => {}
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Final component of a normalized path (empty for `/`).
pub fn basename(path: &str) -> String {
    let normalized = normalize_path(path);
    normalized
        .rsplit('/')
        .next()
        .filter(|name| *name != ".")
        .unwrap_or_default()
        .to_string()
}

/// Encode an absolute path as a directory name: `/a/b` becomes `-a-b`.
pub fn encode_dir_name(path: &str) -> String {
    path.replace('/', &ENCODED_SEPARATOR.to_string())
}

/// Convert a `file://` URI to a path; other strings pass through unchanged.
pub fn uri_to_path(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix("file://") else {
        return uri.to_string();
    };
    // Skip the authority component (usually empty).
    let path = rest.find('/').map_or("", |idx| &rest[idx..]);
    urlencoding::decode(path).map_or_else(|_| path.to_string(), std::borrow::Cow::into_owned)
}

pub fn path_to_uri(path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("file://{encoded}")
}

/// Collect known project paths sharing the requested basename at a different location.
///
/// Advisory only; the result is sorted and deduplicated.
pub fn find_alternate_paths<I>(requested: &str, known: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let requested = normalize_path(requested);
    let target = basename(&requested);
    if target.is_empty() {
        return Vec::new();
    }

    known
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .map(|candidate| normalize_path(&candidate))
        .filter(|candidate| *candidate != requested && basename(candidate) == target)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
