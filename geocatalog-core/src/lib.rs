//! Core domain for the geocatalog workspace.
//!
//! The crate holds the entity-type [`registry`], the [`geometry`] transcoder
//! between GeoJSON and stored EWKB, payload validation, and the SQLite-backed
//! [`GeoStore`] that runs generic CRUD against any registered type.
//!
//! # Examples
//!
//! ```
//! use geocatalog_core::GeoStore;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let store = GeoStore::open(dir.path().join("catalog.db"))?;
//! let created = store.create(
//!     "stations",
//!     &json!({
//!         "name_station": "Kurskaya",
//!         "geometry": {"type": "Point", "coordinates": [37.66, 55.76]},
//!     }),
//! )?;
//! assert_eq!(store.get("stations", created.id())?, created);
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod error;
pub mod geometry;
pub mod object;
pub mod payload;
pub mod registry;
pub mod store;

pub use entities::{
    BusStop, BusStopCreate, BusStopUpdate, District, DistrictCreate, DistrictUpdate, GeoEntity,
    Patch, Station, StationCreate, StationUpdate, Street, StreetCreate, StreetUpdate,
};
pub use error::GeoObjectError;
pub use geometry::{GeometryFormatError, GeometryKind, StoreGeometry};
pub use object::{GeoObject, Timestamps};
pub use payload::{FieldViolation, Properties, ScalarValue, ValidationError};
pub use registry::{EntityKind, EntityType, IdentityPolicy, UnknownEntityType, resolve};
pub use store::{BulkWriter, GeoStore, SchemaError, StagedRow};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
