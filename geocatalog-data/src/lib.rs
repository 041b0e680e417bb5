//! Bulk loading of external GeoJSON layers into the geocatalog store.
//!
//! Responsibilities:
//! - Map each source file's feature properties onto an entity type's fields.
//! - Seed the store in one pass: provision, clear, then load per file.
//!
//! Boundaries:
//! - Validation and persistence rules live in `geocatalog-core`.
//! - Nothing here is reachable from the HTTP surface.
//!
//! Invariants:
//! - A failing source never aborts the remaining sources.
//! - Each source file commits at most once.

pub mod fs;
pub mod import;

pub use import::{
    BUS_STOPS, DEFAULT_DATA_DIR, DISTRICTS, FieldRule, ImportError, ImportReport,
    PropertyMapping, STATIONS, STREETS, SourceOutcome, SourceReport, SourceSpec, default_sources,
    run_import,
};
