//! Static registry of the catalog's entity types.
//!
//! The registry is a fixed table: each [`EntityKind`] maps to one
//! [`EntityType`] record describing its table, geometry kind, identity policy
//! and scalar fields. Nothing registers types at runtime, so lookups need no
//! synchronisation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::GeometryKind;

/// How an entity type assigns identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// The store assigns the id at insert time.
    Generated,
    /// The caller supplies the id on create; collisions are rejected.
    External,
}

/// Storage type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 text with an optional maximum length in characters.
    Text {
        /// Longest accepted value, if bounded.
        max_len: Option<usize>,
    },
    /// Signed 64-bit integer.
    Integer,
}

/// Who may write a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// Must be present and non-null in every create payload.
    Required,
    /// May be set on create and update.
    Optional,
    /// Written only by the bulk importer; API payloads cannot set it.
    ImportOnly,
}

/// Declaration of one scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column and payload key.
    pub name: &'static str,
    /// Storage type.
    pub field_type: FieldType,
    /// Write access.
    pub access: FieldAccess,
    /// Whether the column accepts `null`.
    pub nullable: bool,
    /// Whether the column carries a `UNIQUE` constraint.
    pub unique: bool,
}

impl FieldDef {
    const fn text(name: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::Text { max_len: None },
            access: FieldAccess::Optional,
            nullable: true,
            unique: false,
        }
    }

    const fn bounded_text(name: &'static str, max_len: usize) -> Self {
        Self {
            field_type: FieldType::Text {
                max_len: Some(max_len),
            },
            ..Self::text(name)
        }
    }

    const fn required(self) -> Self {
        Self {
            access: FieldAccess::Required,
            ..self
        }
    }

    const fn non_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    const fn import_fid() -> Self {
        Self {
            name: "fid",
            field_type: FieldType::Integer,
            access: FieldAccess::ImportOnly,
            nullable: true,
            unique: true,
        }
    }

    /// Whether API payloads may write this field.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        !matches!(self.access, FieldAccess::ImportOnly)
    }
}

/// Registry record for one entity type.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityType {
    /// Registry key.
    pub kind: EntityKind,
    /// Backing table.
    pub table: &'static str,
    /// Geometry kind stored in the `geometry` column.
    pub geometry: GeometryKind,
    /// Whether the `geometry` column accepts `NULL`.
    pub nullable_geometry: bool,
    /// Identity policy.
    pub identity: IdentityPolicy,
    /// Scalar columns in declaration order.
    pub fields: &'static [FieldDef],
    /// Whether rows carry an opaque `properties_data` object.
    pub properties: bool,
    /// Whether rows carry `created_at`/`updated_at`.
    pub timestamps: bool,
}

impl EntityType {
    /// Registry key, such as `"districts"`.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.kind.key()
    }

    /// Look up a scalar field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Registered entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Administrative districts.
    Districts,
    /// Streets keyed by caller-supplied ids.
    Streets,
    /// Metro and rail stations.
    Stations,
    /// Bus and tram stops.
    BusStops,
    /// Free-form user objects.
    CustomObjects,
}

impl EntityKind {
    /// Every registered kind in registry order.
    pub const ALL: [Self; 5] = [
        Self::Districts,
        Self::Streets,
        Self::Stations,
        Self::BusStops,
        Self::CustomObjects,
    ];

    /// Registry key used in routes and payloads.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Districts => "districts",
            Self::Streets => "streets",
            Self::Stations => "stations",
            Self::BusStops => "bus_stops",
            Self::CustomObjects => "custom_objects",
        }
    }

    /// Registry record for this kind.
    #[must_use]
    pub const fn entity_type(self) -> &'static EntityType {
        match self {
            Self::Districts => &DISTRICTS,
            Self::Streets => &STREETS,
            Self::Stations => &STATIONS,
            Self::BusStops => &BUS_STOPS,
            Self::CustomObjects => &CUSTOM_OBJECTS,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityType;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == key)
            .ok_or_else(|| UnknownEntityType {
                key: key.to_owned(),
            })
    }
}

/// Raised when a key names no registered entity type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown object type: {key}")]
pub struct UnknownEntityType {
    /// Key that failed to resolve.
    pub key: String,
}

/// Resolve a registry key. Lookup is exact and case-sensitive.
///
/// # Errors
///
/// Returns [`UnknownEntityType`] for keys outside the registry.
///
/// # Examples
///
/// ```
/// use geocatalog_core::registry::{IdentityPolicy, resolve};
///
/// let streets = resolve("streets").expect("streets are registered");
/// assert_eq!(streets.identity, IdentityPolicy::External);
/// assert!(resolve("Streets").is_err());
/// ```
pub fn resolve(key: &str) -> Result<&'static EntityType, UnknownEntityType> {
    key.parse::<EntityKind>().map(EntityKind::entity_type)
}

static DISTRICTS: EntityType = EntityType {
    kind: EntityKind::Districts,
    table: "districts",
    geometry: GeometryKind::MultiPolygon,
    nullable_geometry: true,
    identity: IdentityPolicy::Generated,
    fields: &[
        FieldDef::import_fid(),
        FieldDef::text("name").required(),
        FieldDef::text("name_ao").required(),
    ],
    properties: true,
    timestamps: false,
};

static STREETS: EntityType = EntityType {
    kind: EntityKind::Streets,
    table: "streets",
    geometry: GeometryKind::MultiLineString,
    nullable_geometry: true,
    identity: IdentityPolicy::External,
    fields: &[
        FieldDef::import_fid(),
        FieldDef::text("st_name"),
        FieldDef::text("road_categ"),
    ],
    properties: true,
    timestamps: false,
};

static STATIONS: EntityType = EntityType {
    kind: EntityKind::Stations,
    table: "stations",
    geometry: GeometryKind::Point,
    nullable_geometry: true,
    identity: IdentityPolicy::Generated,
    fields: &[
        FieldDef::text("name_station").required(),
        FieldDef::text("name_line"),
        FieldDef::text("station_type"),
    ],
    properties: true,
    timestamps: false,
};

static BUS_STOPS: EntityType = EntityType {
    kind: EntityKind::BusStops,
    table: "bus_tram_stops",
    geometry: GeometryKind::Point,
    nullable_geometry: true,
    identity: IdentityPolicy::Generated,
    fields: &[
        FieldDef::import_fid(),
        FieldDef::text("name_mpv").required(),
        FieldDef::text("rayon"),
        FieldDef::text("ao"),
        FieldDef::text("address_mpv"),
        FieldDef::text("marshrut"),
    ],
    properties: true,
    timestamps: false,
};

static CUSTOM_OBJECTS: EntityType = EntityType {
    kind: EntityKind::CustomObjects,
    table: "custom_objects",
    geometry: GeometryKind::Point,
    nullable_geometry: false,
    identity: IdentityPolicy::Generated,
    fields: &[
        FieldDef::bounded_text("name", 255).required().non_null(),
        FieldDef::text("description"),
        FieldDef::bounded_text("object_type", 100),
    ],
    properties: false,
    timestamps: true,
};
