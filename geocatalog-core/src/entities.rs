//! Compile-time typed payloads for the per-type routes.
//!
//! These structs mirror the registry's Create, Update and Read shapes. They
//! are serialised into the generic payload form and go through the same
//! validation as untyped requests, so both surfaces share one contract.

use geojson::Geometry as GeoJsonGeometry;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::{payload::Properties, registry::EntityKind};

/// Field of an update payload: absent, explicitly `null`, or a value.
pub type Patch<T> = Option<Option<T>>;

/// Keep an explicit `null` distinct from an absent key.
fn present<'de, T, D>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Binds a typed Read struct to its registry entry and payload shapes.
pub trait GeoEntity: Serialize + DeserializeOwned + Send + 'static {
    /// Registry entry backing the type.
    const KIND: EntityKind;
    /// Create payload.
    type Create: Serialize + DeserializeOwned + Send + 'static;
    /// Merge-patch update payload.
    type Update: Serialize + DeserializeOwned + Send + 'static;
}

/// Administrative district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    /// Store identity.
    pub id: i64,
    /// Source feature id, set only by the importer.
    pub fid: Option<i64>,
    /// District name.
    pub name: Option<String>,
    /// Administrative okrug.
    pub name_ao: Option<String>,
    /// Opaque source properties.
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: Option<GeoJsonGeometry>,
}

/// Create payload for [`District`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictCreate {
    /// District name.
    pub name: String,
    /// Administrative okrug.
    pub name_ao: String,
    /// Opaque source properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: GeoJsonGeometry,
}

/// Merge-patch payload for [`District`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictUpdate {
    /// District name.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Patch<String>,
    /// Administrative okrug.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name_ao: Patch<String>,
    /// Opaque source properties.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub properties_data: Patch<Properties>,
    /// GeoJSON geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeoJsonGeometry>,
}

impl GeoEntity for District {
    const KIND: EntityKind = EntityKind::Districts;
    type Create = DistrictCreate;
    type Update = DistrictUpdate;
}

/// Street segment keyed by a caller-supplied id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Street {
    /// Store identity.
    pub id: i64,
    /// Source feature id, set only by the importer.
    pub fid: Option<i64>,
    /// Street name.
    pub st_name: Option<String>,
    /// Road category.
    pub road_categ: Option<String>,
    /// Opaque source properties.
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: Option<GeoJsonGeometry>,
}

/// Create payload for [`Street`]; the caller chooses `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetCreate {
    /// Caller-supplied identity.
    pub id: i64,
    /// Street name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub st_name: Option<String>,
    /// Road category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_categ: Option<String>,
    /// Opaque source properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: GeoJsonGeometry,
}

/// Merge-patch payload for [`Street`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreetUpdate {
    /// Street name.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub st_name: Patch<String>,
    /// Road category.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub road_categ: Patch<String>,
    /// Opaque source properties.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub properties_data: Patch<Properties>,
    /// GeoJSON geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeoJsonGeometry>,
}

impl GeoEntity for Street {
    const KIND: EntityKind = EntityKind::Streets;
    type Create = StreetCreate;
    type Update = StreetUpdate;
}

/// Metro, MCD or MCC station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Store identity.
    pub id: i64,
    /// Station name.
    pub name_station: Option<String>,
    /// Line the station serves.
    pub name_line: Option<String>,
    /// Network kind, such as metro.
    pub station_type: Option<String>,
    /// Opaque source properties.
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: Option<GeoJsonGeometry>,
}

/// Create payload for [`Station`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationCreate {
    /// Station name.
    pub name_station: String,
    /// Line the station serves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_line: Option<String>,
    /// Network kind, such as metro.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_type: Option<String>,
    /// Opaque source properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: GeoJsonGeometry,
}

/// Merge-patch payload for [`Station`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationUpdate {
    /// Station name.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name_station: Patch<String>,
    /// Line the station serves.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name_line: Patch<String>,
    /// Network kind, such as metro.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub station_type: Patch<String>,
    /// Opaque source properties.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub properties_data: Patch<Properties>,
    /// GeoJSON geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeoJsonGeometry>,
}

impl GeoEntity for Station {
    const KIND: EntityKind = EntityKind::Stations;
    type Create = StationCreate;
    type Update = StationUpdate;
}

/// Bus or tram stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    /// Store identity.
    pub id: i64,
    /// Source feature id, set only by the importer.
    pub fid: Option<i64>,
    /// Stop name.
    pub name_mpv: Option<String>,
    /// Municipal district.
    pub rayon: Option<String>,
    /// Administrative okrug.
    pub ao: Option<String>,
    /// Street address.
    pub address_mpv: Option<String>,
    /// Routes serving the stop.
    pub marshrut: Option<String>,
    /// Opaque source properties.
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: Option<GeoJsonGeometry>,
}

/// Create payload for [`BusStop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStopCreate {
    /// Stop name.
    pub name_mpv: String,
    /// Municipal district.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rayon: Option<String>,
    /// Administrative okrug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ao: Option<String>,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_mpv: Option<String>,
    /// Routes serving the stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marshrut: Option<String>,
    /// Opaque source properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties_data: Option<Properties>,
    /// GeoJSON geometry.
    pub geometry: GeoJsonGeometry,
}

/// Merge-patch payload for [`BusStop`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusStopUpdate {
    /// Stop name.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name_mpv: Patch<String>,
    /// Municipal district.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub rayon: Patch<String>,
    /// Administrative okrug.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub ao: Patch<String>,
    /// Street address.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub address_mpv: Patch<String>,
    /// Routes serving the stop.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub marshrut: Patch<String>,
    /// Opaque source properties.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub properties_data: Patch<Properties>,
    /// GeoJSON geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeoJsonGeometry>,
}

impl GeoEntity for BusStop {
    const KIND: EntityKind = EntityKind::BusStops;
    type Create = BusStopCreate;
    type Update = BusStopUpdate;
}
