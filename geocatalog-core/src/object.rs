//! Read projection of a stored row.

use geojson::Geometry as GeoJsonGeometry;
use serde::{
    Serialize, Serializer,
    de::DeserializeOwned,
    ser::SerializeMap,
};

use crate::{
    payload::{PROPERTIES_KEY, Properties, ScalarValue},
    registry::{EntityKind, EntityType},
};

/// Store-maintained timestamps, as RFC 3339 UTC strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    /// Set once on insert.
    pub created_at: String,
    /// Refreshed on every update.
    pub updated_at: String,
}

/// Outbound representation of one row of any entity type.
///
/// Serialises as a flat JSON object: `id`, the scalar fields in declaration
/// order, `properties_data` for types with a blob, `geometry`, and the
/// timestamps for types that carry them.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoObject {
    pub(crate) entity: &'static EntityType,
    pub(crate) id: i64,
    pub(crate) geometry: Option<GeoJsonGeometry>,
    pub(crate) values: Vec<Option<ScalarValue>>,
    pub(crate) properties: Option<Properties>,
    pub(crate) timestamps: Option<Timestamps>,
}

impl GeoObject {
    /// Entity type of the row.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    /// Row identity.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Decoded geometry, if the row has one.
    #[must_use]
    pub const fn geometry(&self) -> Option<&GeoJsonGeometry> {
        self.geometry.as_ref()
    }

    /// Value of a scalar field; `None` for unknown fields and `null` values.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ScalarValue> {
        self.entity
            .fields
            .iter()
            .zip(&self.values)
            .find(|(field, _)| field.name == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Opaque properties blob.
    #[must_use]
    pub const fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }

    /// Timestamps, for types that carry them.
    #[must_use]
    pub const fn timestamps(&self) -> Option<&Timestamps> {
        self.timestamps.as_ref()
    }

    /// Reshape the projection into a typed entity struct.
    ///
    /// # Errors
    ///
    /// Fails when `T` does not match the projection's JSON shape.
    pub fn into_typed<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

impl Serialize for GeoObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        for (field, value) in self.entity.fields.iter().zip(&self.values) {
            map.serialize_entry(field.name, value)?;
        }
        if self.entity.properties {
            map.serialize_entry(PROPERTIES_KEY, &self.properties)?;
        }
        map.serialize_entry("geometry", &self.geometry)?;
        if let Some(timestamps) = &self.timestamps {
            map.serialize_entry("created_at", &timestamps.created_at)?;
            map.serialize_entry("updated_at", &timestamps.updated_at)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn serialises_flat_projection() {
        let object = GeoObject {
            entity: EntityKind::Stations.entity_type(),
            id: 3,
            geometry: Some(GeoJsonGeometry::new(Value::Point(vec![1.5, 2.5]))),
            values: vec![Some(ScalarValue::from("Kievskaya")), None, None],
            properties: None,
            timestamps: None,
        };
        let json = serde_json::to_value(&object).expect("serialise projection");
        assert_eq!(
            json,
            json!({
                "id": 3,
                "name_station": "Kievskaya",
                "name_line": null,
                "station_type": null,
                "properties_data": null,
                "geometry": {"type": "Point", "coordinates": [1.5, 2.5]},
            })
        );
        assert_eq!(object.field("name_station"), Some(&ScalarValue::from("Kievskaya")));
        assert_eq!(object.field("name_line"), None);
    }

    #[rstest]
    fn custom_objects_carry_timestamps_without_blob() {
        let object = GeoObject {
            entity: EntityKind::CustomObjects.entity_type(),
            id: 1,
            geometry: None,
            values: vec![Some(ScalarValue::from("Bench")), None, None],
            properties: None,
            timestamps: Some(Timestamps {
                created_at: "2024-05-01T10:00:00.000Z".to_owned(),
                updated_at: "2024-05-01T10:00:00.000Z".to_owned(),
            }),
        };
        let json = serde_json::to_value(&object).expect("serialise projection");
        let keys: Vec<_> = json
            .as_object()
            .expect("object projection")
            .keys()
            .cloned()
            .collect();
        assert!(!keys.contains(&PROPERTIES_KEY.to_owned()));
        assert!(keys.contains(&"created_at".to_owned()));
        assert!(keys.contains(&"updated_at".to_owned()));
    }
}
