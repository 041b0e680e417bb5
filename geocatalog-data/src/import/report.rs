//! Per-source outcome records returned by [`run_import`](super::run_import).

use std::fmt;

use geocatalog_core::EntityKind;
use serde::Serialize;

/// How loading one source file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Rows were staged and committed.
    Loaded,
    /// The file parsed but yielded no rows to stage.
    Empty,
    /// The file does not exist.
    Missing,
    /// The file is not a GeoJSON feature collection.
    Malformed,
    /// The file could not be read, or its batch failed to commit.
    Failed,
}

impl fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::Empty => "empty",
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::Failed => "failed",
        })
    }
}

/// Counters for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// File name relative to the data directory.
    pub file: String,
    /// Entity type the file feeds.
    pub entity: EntityKind,
    /// Features found in the collection.
    pub features_read: usize,
    /// Features dropped before staging.
    pub features_skipped: usize,
    /// Rows committed to the store.
    pub rows_committed: usize,
    /// Final state of the source.
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub(crate) fn pending(file: &str, entity: EntityKind) -> Self {
        Self {
            file: file.to_owned(),
            entity,
            features_read: 0,
            features_skipped: 0,
            rows_committed: 0,
            outcome: SourceOutcome::Empty,
        }
    }
}

/// Summary of a whole import run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ImportReport {
    /// Rows deleted before loading.
    pub rows_cleared: usize,
    /// One entry per configured source, in load order.
    pub sources: Vec<SourceReport>,
}

impl ImportReport {
    /// Total rows committed across all sources.
    #[must_use]
    pub fn rows_committed(&self) -> usize {
        self.sources.iter().map(|source| source.rows_committed).sum()
    }

    /// Rows committed for one entity type.
    #[must_use]
    pub fn committed_for(&self, entity: EntityKind) -> usize {
        self.sources
            .iter()
            .filter(|source| source.entity == entity)
            .map(|source| source.rows_committed)
            .sum()
    }

    /// Report entry for the given file name.
    #[must_use]
    pub fn source(&self, file: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|source| source.file == file)
    }
}
