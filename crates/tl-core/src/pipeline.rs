//! Reconciliation pipeline: scan, merge, and fall back to alternate-path discovery.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::merge::{MergedCounts, merge_streams};
use crate::project::{ProjectIdentity, ProjectQuery, find_alternate_paths};
use crate::source::Source;

/// A source usable from the parallel pipeline.
pub type DynSource<'a> = &'a (dyn Source + Sync);

/// Merged counts for one tool plus any moved-project hints.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub merged: MergedCounts,
    pub alternate_paths: Vec<String>,
}

/// Scan the primary and fallback sources concurrently, then merge.
///
/// When a concrete path matched nothing, every source's store is searched
/// for the same basename at another location.
pub fn reconcile(
    identity: &ProjectIdentity,
    primary: DynSource<'_>,
    fallbacks: &[DynSource<'_>],
) -> Reconciliation {
    let (primary_scan, fallback_scans) = rayon::join(
        || primary.scan(identity),
        || {
            fallbacks
                .par_iter()
                .map(|source| source.scan(identity))
                .collect::<Vec<_>>()
        },
    );

    let merged = merge_streams(&primary_scan, &fallback_scans);

    let alternate_paths = match identity.requested() {
        ProjectQuery::Path(path) if merged.total == 0 => {
            let all: Vec<DynSource<'_>> = std::iter::once(primary)
                .chain(fallbacks.iter().copied())
                .collect();
            let known: BTreeSet<String> = all
                .par_iter()
                .flat_map_iter(|source| source.known_projects())
                .collect();
            let alternates = find_alternate_paths(path, known);
            if !alternates.is_empty() {
                tracing::info!(
                    requested = %path,
                    count = alternates.len(),
                    "no activity at requested path, found same project name elsewhere"
                );
            }
            alternates
        }
        _ => Vec::new(),
    };

    Reconciliation {
        merged,
        alternate_paths,
    }
}
